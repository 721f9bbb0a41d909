//! What a queued hook does with a payload that does not fit in its queue
//!
//! In configuration files the policy is written in snake case, with the
//! timeout variant given in milliseconds:
//!
//! ```
//! use rust_deferred_logger::OverflowPolicy;
//! use std::time::Duration;
//!
//! let policy: OverflowPolicy = serde_json::from_str(r#"{"block_with_timeout": 250}"#).unwrap();
//! assert_eq!(policy, OverflowPolicy::BlockWithTimeout(Duration::from_millis(250)));
//! assert_eq!(policy.to_string(), "block_with_timeout(250ms)");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the payload and count it as dropped
    DropNewest,

    /// Wait for room in the queue
    ///
    /// Every emitted record is handed to hooks while the output lock is
    /// held, so a full queue stalls every other caller of the same logger
    /// too, whatever the level.
    Block,

    /// Wait up to the given time, then discard with an alert
    BlockWithTimeout(#[serde(with = "millis")] Duration),

    /// Discard and print a `[LOGGER WARNING]` on the first drop and every
    /// thousandth after it
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => f.write_str("drop_newest"),
            OverflowPolicy::Block => f.write_str("block"),
            OverflowPolicy::BlockWithTimeout(d) => {
                write!(f, "block_with_timeout({}ms)", d.as_millis())
            }
            OverflowPolicy::AlertAndDrop => f.write_str("alert_and_drop"),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
