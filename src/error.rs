use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the Snowflake generator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnowflakeError {
    /// Instance id is negative or does not fit in the node field
    #[error("Instance ID {instance_id} is invalid. Allowed range is 0..={max}")]
    InvalidInstanceId { instance_id: i64, max: u16 },
    /// Configured epoch is not before the current time
    #[error("Epoch {epoch}ms is not in the past (now {now}ms)")]
    EpochInFuture { epoch: u64, now: u64 },
    /// Every sequence slot of the current millisecond is taken
    #[error("Sequence exhausted for timestamp {timestamp}. Retry after the clock advances")]
    SequenceExhausted { timestamp: u64 },
}

/// Errors raised while allocating an instance id
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocError {
    /// Transient store or network failure
    #[error("Coordination store unavailable at {path}: {source}")]
    CoordinationUnavailable {
        path: String,
        #[source]
        source: StoreError,
    },
    /// Registration path is missing or is not a directory
    #[error("Registration path {path} is not a directory: {reason}")]
    NodeShape { path: String, reason: String },
    /// Another replica created the candidate slot first
    #[error("Lost race for slot {id} under {path}")]
    RaceLost { path: String, id: u32 },
    /// Every attempt failed
    #[error("Instance id allocation failed for {path} after {attempts} attempts")]
    RetryBudgetExhausted {
        path: String,
        attempts: u32,
        #[source]
        last: Box<AllocError>,
    },
}

impl AllocError {
    /// Whether another scan-and-create attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AllocError::CoordinationUnavailable { .. } | AllocError::RaceLost { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let invalid = SnowflakeError::InvalidInstanceId {
            instance_id: -1,
            max: 1023,
        };
        assert_eq!(
            invalid.to_string(),
            "Instance ID -1 is invalid. Allowed range is 0..=1023"
        );

        let exhausted = AllocError::RetryBudgetExhausted {
            path: "/roc/servid/account".to_string(),
            attempts: 3,
            last: Box::new(AllocError::RaceLost {
                path: "/roc/servid/account".to_string(),
                id: 0,
            }),
        };
        assert_eq!(
            exhausted.to_string(),
            "Instance id allocation failed for /roc/servid/account after 3 attempts"
        );
    }

    #[test]
    fn test_exhausted_keeps_last_error_as_source() {
        let err = AllocError::RetryBudgetExhausted {
            path: "/svc".to_string(),
            attempts: 2,
            last: Box::new(AllocError::RaceLost {
                path: "/svc".to_string(),
                id: 4,
            }),
        };
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "Lost race for slot 4 under /svc");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AllocError::RaceLost {
            path: "/a".into(),
            id: 0
        }
        .is_retryable());
        assert!(AllocError::CoordinationUnavailable {
            path: "/a".into(),
            source: StoreError::Timeout { key: "/a".into() },
        }
        .is_retryable());
        assert!(!AllocError::NodeShape {
            path: "/a".into(),
            reason: "leaf".into()
        }
        .is_retryable());
    }
}
