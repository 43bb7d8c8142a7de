//! Seam between sessions and whatever carries the bytes. Sessions consume
//! [`ChannelEvent`]s from an mpsc queue and write through [`Channel`]
//! handles; socket ownership stays in the binaries' adapters.

use std::error::Error;
use std::fmt;

/// A point-to-point, possibly-lossy link to one peer. Sends are
/// fire-and-forget: a dropped datagram is not an error, `Err` means the
/// channel as a whole is unusable and the peer should be dropped.
pub trait Channel: Send {
    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError>;
    fn peer(&self) -> &str;
    fn is_open(&self) -> bool;
}

#[derive(Debug)]
pub enum ChannelError {
    Closed,
    Io(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Closed => write!(f, "channel closed"),
            ChannelError::Io(detail) => write!(f, "channel transport failure: {}", detail),
        }
    }
}

impl Error for ChannelError {}

/// What the transport adapter reports into a session's event queue.
pub enum ChannelEvent {
    Connected {
        peer: String,
        channel: Box<dyn Channel>,
    },
    Data {
        peer: String,
        bytes: Vec<u8>,
    },
    Disconnected {
        peer: String,
    },
}
