//! Overflow policies for the async dispatch queue
//!
//! When an async logger's queue is full, the policy decides what the
//! producing thread does with its record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling queue overflow in async logging
///
/// # Example
///
/// ```
/// use named_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: wait for space, never lose a record
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
///
/// // Wait a bounded time, then drop
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Block the producer until space is available
    ///
    /// No record is ever lost; a slow sink slows every producer down.
    #[default]
    Block,

    /// Block with timeout, then drop
    BlockWithTimeout(Duration),

    /// Drop the new record, count it and notify the overflow callback
    DropNewest,

    /// Refuse the new record and return `QueueFull` to the producer
    Reject,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Reject => write!(f, "Reject"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when records are dropped due to queue overflow.
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
