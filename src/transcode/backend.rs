//! The [`ImageTranscoder`] trait and its error type.
//!
//! The production implementation is
//! [`CodecTranscoder`](super::codec::CodecTranscoder); tests use the
//! recording [`MockTranscoder`](tests::MockTranscoder). A transcoder is a
//! pure function from (source bytes, width, variant, options) to encoded
//! bytes — no filesystem, no shared state — which is why the pipeline can
//! fan jobs out across threads freely.

use super::params::TranscodeJob;
use crate::naming::FormatFamily;
use thiserror::Error;

/// Stage of the transcode pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeStage {
    /// Decoding the source buffer.
    Decode,
    /// Codec-level resize + encode.
    Encode,
    /// Lossy recompression pass.
    Compress,
}

impl std::fmt::Display for TranscodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscodeStage::Decode => write!(f, "decode"),
            TranscodeStage::Encode => write!(f, "encode"),
            TranscodeStage::Compress => write!(f, "compress"),
        }
    }
}

/// A transcode failure, tagged with the failing stage and target format.
#[derive(Error, Debug)]
#[error("{stage} stage failed for {format}: {message}")]
pub struct TranscodeError {
    pub stage: TranscodeStage,
    pub format: FormatFamily,
    pub message: String,
}

impl TranscodeError {
    pub fn new(
        stage: TranscodeStage,
        format: FormatFamily,
        message: impl std::fmt::Display,
    ) -> Self {
        Self {
            stage,
            format,
            message: message.to_string(),
        }
    }
}

/// Contract around the codec and compression collaborators: one derivative
/// in, encoded bytes out. Stateless from the pipeline's perspective.
pub trait ImageTranscoder: Sync {
    fn transcode(&self, job: &TranscodeJob) -> Result<Vec<u8>, TranscodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::naming::Variant;
    use std::sync::Mutex;
    use std::time::Duration;

    /// One transcode call as seen by the mock.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedJob {
        pub width: u32,
        pub variant: Variant,
        pub family: FormatFamily,
        pub quality: u32,
    }

    /// Mock transcoder that records jobs and fabricates output bytes.
    ///
    /// Uses a Mutex (not RefCell) so it is Sync and works under rayon.
    #[derive(Default)]
    pub struct MockTranscoder {
        pub jobs: Mutex<Vec<RecordedJob>>,
        /// Widths whose jobs should fail, for error-path tests.
        pub fail_widths: Vec<u32>,
        /// Artificial per-job latency, for concurrency tests.
        pub delay: Option<Duration>,
    }

    impl MockTranscoder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(width: u32) -> Self {
            Self {
                fail_widths: vec![width],
                ..Self::default()
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn recorded(&self) -> Vec<RecordedJob> {
            self.jobs.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }
    }

    impl ImageTranscoder for MockTranscoder {
        fn transcode(&self, job: &TranscodeJob) -> Result<Vec<u8>, TranscodeError> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.jobs.lock().unwrap().push(RecordedJob {
                width: job.width,
                variant: job.variant,
                family: job.family,
                quality: job.options.quality.value(),
            });
            if self.fail_widths.contains(&job.width) {
                return Err(TranscodeError::new(
                    TranscodeStage::Encode,
                    job.family,
                    "mock failure",
                ));
            }
            Ok(format!("{}-{}", job.family, job.width).into_bytes())
        }
    }

    #[test]
    fn mock_records_jobs_and_fabricates_bytes() {
        use crate::transcode::params::CompressionOptions;
        use std::sync::Arc;

        let mock = MockTranscoder::new();
        let job = TranscodeJob {
            source: Arc::new(vec![1, 2, 3]),
            width: 500,
            variant: Variant::Modern,
            family: FormatFamily::WebP,
            options: CompressionOptions::default().resolve(),
        };
        let bytes = mock.transcode(&job).unwrap();
        assert_eq!(bytes, b"webp-500");

        let recorded = mock.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].width, 500);
        assert_eq!(recorded[0].quality, 70);
    }

    #[test]
    fn mock_failure_carries_stage_and_format() {
        use crate::transcode::params::CompressionOptions;
        use std::sync::Arc;

        let mock = MockTranscoder::failing_on(250);
        let job = TranscodeJob {
            source: Arc::new(Vec::new()),
            width: 250,
            variant: Variant::Native,
            family: FormatFamily::Jpeg,
            options: CompressionOptions::default().resolve(),
        };
        let err = mock.transcode(&job).unwrap_err();
        assert_eq!(err.stage, TranscodeStage::Encode);
        assert_eq!(err.format, FormatFamily::Jpeg);
        assert_eq!(err.to_string(), "encode stage failed for jpeg: mock failure");
    }
}
