//! A pure Rust D-Bus wire codec and connection state machine for Tokio.
//!
//! This crate decodes and encodes D-Bus messages from plain byte buffers
//! with no I/O dependency of its own, and layers an asynchronous
//! [`Connection`] on top that drives the SASL handshake and request/reply
//! correlation over any ordered, reliable, octet-stream transport.
//!
//! So far this covers writing clients: issuing method calls, replying to
//! them, and receiving signals. It does not attempt to be a full
//! object-tree server framework.

#![deny(missing_docs)]
#![allow(clippy::module_inception)]

#[macro_use]
mod macros;

#[doc(inline)]
pub use self::ty::{Endianness, Type};
mod ty;

#[doc(inline)]
pub use self::error::{Error, ErrorKind, Result};
mod error;

#[doc(inline)]
pub use self::signature::{Signature, SignatureError};
mod signature;

#[doc(inline)]
pub use self::object_path::{ObjectPath, ObjectPathError};
mod object_path;

#[doc(inline)]
pub use self::names::NameError;
mod names;

pub(crate) mod buf;

#[doc(inline)]
pub use self::value::Value;
mod value;

#[doc(inline)]
pub use self::message::{
    decode, encode, Flags, HeaderField, Message, MessageType, Request, MAX_MESSAGE_LEN,
};
mod message;

pub(crate) mod frame;

mod sasl;
#[doc(inline)]
pub use self::sasl::AuthType;

pub mod freedesktop;

#[cfg(feature = "tokio")]
#[doc(inline)]
pub use self::connection::{Connection, ConnectOptions, ConnectionBuilder, Incoming};
#[cfg(feature = "tokio")]
mod connection;
