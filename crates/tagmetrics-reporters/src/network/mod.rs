//! Network transports for push-style reporters.

pub mod udp;

pub use udp::{SendCallback, UdpTransport};
