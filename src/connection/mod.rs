//! The async connection state machine: SASL handshake, message framing, and
//! request/reply correlation over any ordered, reliable byte-stream
//! transport.

mod address;
mod builder;
#[allow(clippy::module_inception)]
mod connection;

pub use self::builder::{ConnectOptions, ConnectionBuilder};
pub use self::connection::{Connection, Incoming};
