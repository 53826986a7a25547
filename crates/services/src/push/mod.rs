mod channel;
mod engine_io;
mod envelope;

pub use channel::{PushChannel, PushPeer, socket_url};
pub use engine_io::Packet;
pub use envelope::{ClassroomCommand, PushEvent};

/// Event name carrying notifications from student devices.
pub const INBOUND_EVENT: &str = "from_flutter";

/// Event name carrying dashboard commands to student devices.
pub const OUTBOUND_EVENT: &str = "to_flutter";
