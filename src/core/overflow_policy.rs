//! What a bounded dispatch queue does with a submission that finds it full
//!
//! The queue is unbounded unless a capacity is configured, in which case
//! none of this applies until the consumer falls behind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Overflow handling for a bounded queue
///
/// In a config document the policy is a snake_case name, with the timeout
/// variant given in milliseconds:
///
/// ```
/// use log_pipeline::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy: OverflowPolicy = serde_json::from_str(r#""drop_newest""#).unwrap();
/// assert_eq!(policy, OverflowPolicy::DropNewest);
///
/// let policy: OverflowPolicy = serde_json::from_str(r#"{"block_with_timeout": 250}"#).unwrap();
/// assert_eq!(policy, OverflowPolicy::BlockWithTimeout(Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the event; only the metrics see it
    DropNewest,

    /// Wait for queue space. The producer then runs at the pace of the
    /// slowest sink.
    Block,

    /// Wait up to the timeout, then discard with an alert
    BlockWithTimeout(#[serde(with = "millis")] Duration),

    /// Discard, print a rate-limited stderr alert and call the overflow callback
    #[default]
    AlertAndDrop,
}

impl OverflowPolicy {
    /// Whether a full queue can make `submit` wait
    pub fn may_block(&self) -> bool {
        matches!(self, OverflowPolicy::Block | OverflowPolicy::BlockWithTimeout(_))
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => f.write_str("drop_newest"),
            OverflowPolicy::Block => f.write_str("block"),
            OverflowPolicy::BlockWithTimeout(timeout) => {
                write!(f, "block_with_timeout({}ms)", timeout.as_millis())
            }
            OverflowPolicy::AlertAndDrop => f.write_str("alert_and_drop"),
        }
    }
}

/// Called with the running total of dropped events whenever an alert fires
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alerts() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::AlertAndDrop);
        assert!(!OverflowPolicy::default().may_block());
    }

    #[test]
    fn test_display_matches_config_names() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "drop_newest");
        assert_eq!(OverflowPolicy::Block.to_string(), "block");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "block_with_timeout(100ms)"
        );
        assert_eq!(OverflowPolicy::AlertAndDrop.to_string(), "alert_and_drop");
    }

    #[test]
    fn test_timeout_serializes_as_millis() {
        let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(5));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"block_with_timeout":5}"#);
        assert_eq!(serde_json::from_str::<OverflowPolicy>(&json).unwrap(), policy);
        assert!(policy.may_block());

        let policy: OverflowPolicy = serde_json::from_str("\"block\"").unwrap();
        assert_eq!(policy, OverflowPolicy::Block);
        assert!(serde_json::from_str::<OverflowPolicy>("\"drop_oldest\"").is_err());
    }
}
