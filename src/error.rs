//! The crate-wide error type.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;

use crate::object_path::ObjectPathError;
use crate::signature::SignatureError;

/// Result alias using [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised while decoding, encoding, or driving a connection.
///
/// The concrete cause is deliberately hidden behind this opaque type so that
/// it can evolve without breaking callers who only match on [`Error::kind`].
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// The classification of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Test if this error indicates the remote rejected authentication.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self.kind, ErrorKind::AuthRejected(..))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(..) => write!(f, "I/O error"),
            ErrorKind::Signature(..) => write!(f, "signature error"),
            ErrorKind::ObjectPath(..) => write!(f, "object path error"),
            ErrorKind::Utf8(..) => write!(f, "UTF-8 error"),
            ErrorKind::InvalidByteOrder(b) => write!(f, "invalid byte order {b:#04x}"),
            ErrorKind::InvalidMessageType(t) => write!(f, "invalid message type {t}"),
            ErrorKind::InvalidHeader(reason) => write!(f, "invalid header: {reason}"),
            ErrorKind::InvalidValue(reason) => write!(f, "invalid value: {reason}"),
            ErrorKind::InvalidName(reason) => write!(f, "invalid name: {reason}"),
            ErrorKind::ArrayTooLong(len) => {
                write!(f, "array of {len} bytes is too long (max is 67108864)")
            }
            ErrorKind::MessageTooLong(len) => {
                write!(f, "message of {len} bytes is too long (max is 134217728)")
            }
            ErrorKind::MissingHeaderField(name) => {
                write!(f, "missing required header field {name}")
            }
            ErrorKind::SignatureMismatch => write!(f, "body does not match declared signature"),
            ErrorKind::UnsupportedAuthUid => write!(
                f,
                "authenticating using the current UID requires the `libc` feature"
            ),
            ErrorKind::InvalidSaslResponse(line) => {
                write!(f, "unexpected SASL response: {line:?}")
            }
            ErrorKind::AuthRejected(mechs) => {
                write!(f, "authentication rejected, server offered: {mechs:?}")
            }
            ErrorKind::HandshakeFailed => write!(f, "handshake failed"),
            ErrorKind::NotConnected => write!(f, "connection is not open"),
            ErrorKind::Cancelled => write!(f, "request was cancelled"),
            ErrorKind::RemoteError { name, .. } => write!(f, "remote error: {name}"),
            ErrorKind::MissingBus => write!(
                f,
                "no bus address found in the environment and no default is defined"
            ),
            ErrorKind::InvalidAddress(address) => write!(f, "invalid bus address: {address:?}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Signature(e) => Some(e),
            ErrorKind::ObjectPath(e) => Some(e),
            ErrorKind::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

impl From<SignatureError> for Error {
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl From<Utf8Error> for Error {
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8(error))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The classification of an [`Error`].
///
/// This is `#[non_exhaustive]` so new variants can be added without a major
/// version bump.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// A type signature could not be parsed or was too long.
    Signature(SignatureError),
    /// An object path failed validation.
    ObjectPath(ObjectPathError),
    /// A string was not valid UTF-8.
    Utf8(Utf8Error),
    /// The message's declared byte order byte was neither `'l'` nor `'B'`.
    InvalidByteOrder(u8),
    /// The message's declared type was outside `1..=4`.
    InvalidMessageType(u8),
    /// The fixed header was structurally invalid.
    InvalidHeader(&'static str),
    /// A value failed to decode (e.g. a boolean that was neither 0 nor 1).
    InvalidValue(&'static str),
    /// An object path, interface, member, error, or bus name failed validation.
    InvalidName(&'static str),
    /// An array declared a byte length over the 2^26 cap.
    ArrayTooLong(u32),
    /// A whole message exceeded the 128 MiB cap.
    MessageTooLong(u64),
    /// A required header field for this message type was absent.
    MissingHeaderField(&'static str),
    /// The body's values did not match the declared `SIGNATURE` header field.
    SignatureMismatch,
    /// `AuthType::External` with the process UID was requested without the `libc` feature.
    UnsupportedAuthUid,
    /// The server sent something other than `OK`/`REJECTED` during `await_ok`.
    InvalidSaslResponse(String),
    /// The server rejected every offered mechanism.
    AuthRejected(Vec<String>),
    /// The handshake did not reach `authenticated` (e.g. the Hello bootstrap failed).
    HandshakeFailed,
    /// An operation was attempted on a connection that has been closed.
    NotConnected,
    /// A `call` was cancelled before a reply arrived.
    Cancelled,
    /// An inbound `ERROR` message matched a waiter.
    RemoteError {
        /// The `ERROR_NAME` header field.
        name: String,
        /// The decoded error body.
        body: Vec<crate::value::Value>,
    },
    /// Neither an explicit address nor a usable environment variable named
    /// a bus to connect to.
    MissingBus,
    /// A bus address string did not match a supported `transport:key=value` form.
    InvalidAddress(String),
}
