//! Extraction progress messages
//!
//! Sent from the extraction worker to an optional monitor channel. Each job
//! goes through:
//!
//! Queued → Started → Progress... → Complete/Failed/Cancelled

use std::path::PathBuf;

/// Lifecycle events for queued extraction jobs
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionProgress {
    /// Job accepted into the queue
    Queued { job_id: u64 },

    /// Worker picked the job up
    Started {
        job_id: u64,
        /// What is being rendered ("track vocals", "mix of 3 tracks")
        target: String,
    },

    /// Throttled render progress
    Progress {
        job_id: u64,
        /// 0.0 to 1.0
        fraction: f32,
    },

    /// Output written and closed
    Complete {
        job_id: u64,
        output_path: PathBuf,
        frames_written: u64,
    },

    /// Job failed; any partial output was deleted
    Failed { job_id: u64, error: String },

    /// Job was cancelled; any partial output was deleted
    Cancelled { job_id: u64 },
}

impl ExtractionProgress {
    pub fn job_id(&self) -> u64 {
        match self {
            Self::Queued { job_id }
            | Self::Started { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Complete { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id } => *job_id,
        }
    }

    /// Get a human-readable description of this progress message
    pub fn description(&self) -> String {
        match self {
            Self::Queued { job_id } => format!("Job {} queued", job_id),
            Self::Started { job_id, target } => format!("Job {}: extracting {}", job_id, target),
            Self::Progress { job_id, fraction } => {
                format!("Job {}: {:.0}%", job_id, fraction * 100.0)
            }
            Self::Complete {
                job_id,
                output_path,
                frames_written,
            } => format!(
                "Job {} complete: {} frames to {}",
                job_id,
                frames_written,
                output_path.display()
            ),
            Self::Failed { job_id, error } => format!("Job {} failed: {}", job_id, error),
            Self::Cancelled { job_id } => format!("Job {} cancelled", job_id),
        }
    }

    /// Check if this is the last message for its job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    /// Get the progress fraction (0.0 to 1.0)
    pub fn progress_fraction(&self) -> Option<f32> {
        match self {
            Self::Queued { .. } | Self::Started { .. } => Some(0.0),
            Self::Progress { fraction, .. } => Some(*fraction),
            Self::Complete { .. } => Some(1.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_messages() {
        assert!(!ExtractionProgress::Queued { job_id: 1 }.is_terminal());
        assert!(!ExtractionProgress::Progress { job_id: 1, fraction: 0.5 }.is_terminal());
        assert!(ExtractionProgress::Cancelled { job_id: 1 }.is_terminal());
        assert!(ExtractionProgress::Failed {
            job_id: 1,
            error: "boom".into()
        }
        .is_terminal());
    }

    #[test]
    fn test_fraction_and_description() {
        let msg = ExtractionProgress::Progress { job_id: 7, fraction: 0.25 };
        assert_eq!(msg.job_id(), 7);
        assert_eq!(msg.progress_fraction(), Some(0.25));
        assert_eq!(msg.description(), "Job 7: 25%");
        assert_eq!(ExtractionProgress::Cancelled { job_id: 7 }.progress_fraction(), None);
    }
}
