//! Trigger message carried on the trigger channel
//!
//! A trigger message is a numbered signal. It holds no account data; receiving
//! one makes the consumer run its workload once.

use super::error::TriggerError;
use std::fmt;
use std::str::FromStr;

/// Wire prefix of every trigger message line
const MESSAGE_PREFIX: &str = "Message ";

/// One numbered trigger message
///
/// Rendered on the wire as a single line `Message <sequence>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerMessage {
    /// 1-based sequence number assigned by the producer
    pub sequence: u32,
}

impl TriggerMessage {
    pub fn new(sequence: u32) -> Self {
        TriggerMessage { sequence }
    }
}

impl fmt::Display for TriggerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MESSAGE_PREFIX, self.sequence)
    }
}

impl FromStr for TriggerMessage {
    type Err = TriggerError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        line.trim()
            .strip_prefix(MESSAGE_PREFIX)
            .and_then(|number| number.trim().parse::<u32>().ok())
            .map(TriggerMessage::new)
            .ok_or_else(|| TriggerError::MalformedMessage {
                line: line.to_string(),
            })
    }
}
