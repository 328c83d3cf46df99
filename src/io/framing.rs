//! Line framing for trigger messages
//!
//! Each trigger message travels as one newline-terminated line. The writer side
//! is a `FramedWrite` sink that emits a whole line per `send`; the reader side
//! is a lazy, finite stream of parsed messages that ends when the producer
//! closes the channel.

use super::transport::{ChannelReader, ChannelWriter};
use crate::types::{TriggerError, TriggerMessage};
use futures::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// Longest accepted line, in bytes
pub const MAX_LINE_LENGTH: usize = 256;

/// Sink writing one trigger message line per item
pub type MessageSink = FramedWrite<ChannelWriter, LinesCodec>;

/// Wrap the channel's write half in a line sink
pub fn message_sink(writer: ChannelWriter) -> MessageSink {
    FramedWrite::new(writer, LinesCodec::new_with_max_length(MAX_LINE_LENGTH))
}

/// Stream of trigger messages read from the channel's read half
///
/// Yields `Err(TriggerError::MalformedMessage)` for lines that do not parse
/// (the stream continues after them) and `Err(TriggerError::Read)` for
/// transport or framing failures. Ends at end-of-stream; it cannot be
/// restarted.
pub fn message_stream(
    reader: ChannelReader,
) -> impl Stream<Item = Result<TriggerMessage, TriggerError>> + Send + Unpin {
    FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)).map(|line| {
        line.map_err(TriggerError::read)
            .and_then(|line| line.parse::<TriggerMessage>())
    })
}
