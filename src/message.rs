//! The message codec: whole D-Bus messages, their header fields, and the
//! fixed 12-byte prefix that precedes the header-fields array.

use crate::buf::{Reader, Writer};
use crate::error::{Error, ErrorKind, Result};
use crate::object_path::ObjectPath;
use crate::signature::Signature;
use crate::ty::{Endianness, Type};
use crate::value::{self, Value};

/// The D-Bus-specified cap on a whole message's size (128 MiB). Not derived
/// from the wire format itself - the format has no built-in limit - but
/// required here to bound resource use against an adversarial peer.
pub const MAX_MESSAGE_LEN: u64 = 128 * 1024 * 1024;

raw_enum! {
    /// The kind of a D-Bus message.
    #[repr(u8)]
    pub enum MessageType {
        /// A method invocation, expecting a `METHOD_RETURN` or `ERROR` in reply.
        METHOD_CALL = 1,
        /// A successful reply to a `METHOD_CALL`.
        METHOD_RETURN = 2,
        /// A failed reply to a `METHOD_CALL`.
        ERROR = 3,
        /// A broadcast notification with no reply.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Message flags, a bitfield stored in the fixed header.
    #[repr(u8)]
    pub enum Flags {
        /// The sender will not wait for (and does not want) a reply.
        NO_REPLY_EXPECTED = 0x01,
        /// The bus must not launch an owner for the destination service.
        NO_AUTO_START = 0x02,
        /// The sender permits an interactive authorization dialog. Parsed so
        /// round-tripping a message that carries it does not lose
        /// information; this crate never acts on it itself.
        ALLOW_INTERACTIVE_AUTHORIZATION = 0x04,
    }
}

/// A single header field, carried as an array entry of `STRUCT(BYTE, VARIANT)`.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HeaderField {
    /// Code 1 - the object the message concerns.
    Path(ObjectPath),
    /// Code 2 - the interface a method or signal belongs to.
    Interface(String),
    /// Code 3 - the method or signal name.
    Member(String),
    /// Code 4 - the name of an error, on `ERROR` messages.
    ErrorName(String),
    /// Code 5 - the serial this message is replying to.
    ReplySerial(u32),
    /// Code 6 - the bus name this message is addressed to.
    Destination(String),
    /// Code 7 - the unique bus name of the sender, usually stamped by the broker.
    Sender(String),
    /// Code 8 - the signature of the message body.
    Signature(Signature),
    /// Code 9 - the number of file descriptors accompanying the message.
    UnixFds(u32),
    /// Any header field code this crate does not interpret. Preserved
    /// verbatim so unknown fields round-trip rather than being dropped,
    /// matching the D-Bus requirement that implementations ignore (not
    /// reject) header fields they do not understand.
    Unknown(u8, Value),
}

impl HeaderField {
    fn code(&self) -> u8 {
        match self {
            HeaderField::Path(_) => 1,
            HeaderField::Interface(_) => 2,
            HeaderField::Member(_) => 3,
            HeaderField::ErrorName(_) => 4,
            HeaderField::ReplySerial(_) => 5,
            HeaderField::Destination(_) => 6,
            HeaderField::Sender(_) => 7,
            HeaderField::Signature(_) => 8,
            HeaderField::UnixFds(_) => 9,
            HeaderField::Unknown(code, _) => *code,
        }
    }

    fn value(&self) -> Value {
        match self {
            HeaderField::Path(p) => Value::ObjectPath(p.clone()),
            HeaderField::Interface(s) => Value::str(s.clone()),
            HeaderField::Member(s) => Value::str(s.clone()),
            HeaderField::ErrorName(s) => Value::str(s.clone()),
            HeaderField::ReplySerial(u) => Value::UInt32(*u),
            HeaderField::Destination(s) => Value::str(s.clone()),
            HeaderField::Sender(s) => Value::str(s.clone()),
            HeaderField::Signature(sig) => Value::Signature(sig.clone()),
            HeaderField::UnixFds(u) => Value::UInt32(*u),
            HeaderField::Unknown(_, value) => value.clone(),
        }
    }
}

fn decode_header_field(code: u8, value: Value) -> Result<HeaderField> {
    fn expect_string(value: Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(Error::new(ErrorKind::InvalidHeader(
                "header field value did not match its code",
            ))),
        }
    }

    let field = match code {
        1 => match value {
            Value::ObjectPath(p) => HeaderField::Path(p),
            _ => {
                return Err(Error::new(ErrorKind::InvalidHeader(
                    "PATH header field was not an object path",
                )));
            }
        },
        2 => {
            let s = expect_string(value)?;
            crate::names::validate_interface(&s)
                .map_err(|_| Error::new(ErrorKind::InvalidName("INTERFACE")))?;
            HeaderField::Interface(s)
        }
        3 => {
            let s = expect_string(value)?;
            crate::names::validate_member(&s)
                .map_err(|_| Error::new(ErrorKind::InvalidName("MEMBER")))?;
            HeaderField::Member(s)
        }
        4 => {
            let s = expect_string(value)?;
            crate::names::validate_interface(&s)
                .map_err(|_| Error::new(ErrorKind::InvalidName("ERROR_NAME")))?;
            HeaderField::ErrorName(s)
        }
        5 => match value {
            Value::UInt32(0) => {
                return Err(Error::new(ErrorKind::InvalidHeader("zero REPLY_SERIAL")));
            }
            Value::UInt32(u) => HeaderField::ReplySerial(u),
            _ => {
                return Err(Error::new(ErrorKind::InvalidHeader(
                    "REPLY_SERIAL header field was not a uint32",
                )));
            }
        },
        6 => {
            let s = expect_string(value)?;
            crate::names::validate_bus_name(&s)
                .map_err(|_| Error::new(ErrorKind::InvalidName("DESTINATION")))?;
            HeaderField::Destination(s)
        }
        7 => {
            let s = expect_string(value)?;
            crate::names::validate_bus_name(&s)
                .map_err(|_| Error::new(ErrorKind::InvalidName("SENDER")))?;
            HeaderField::Sender(s)
        }
        8 => match value {
            Value::Signature(sig) => HeaderField::Signature(sig),
            _ => {
                return Err(Error::new(ErrorKind::InvalidHeader(
                    "SIGNATURE header field was not a signature",
                )));
            }
        },
        9 => match value {
            Value::UInt32(u) => HeaderField::UnixFds(u),
            _ => {
                return Err(Error::new(ErrorKind::InvalidHeader(
                    "UNIX_FDS header field was not a uint32",
                )));
            }
        },
        other => HeaderField::Unknown(other, value),
    };

    Ok(field)
}

fn encode_header_field(writer: &mut Writer, field: &HeaderField) -> Result<()> {
    writer.align(8);
    writer.write_u8(field.code());
    let value = field.value();
    let ty = value.ty();
    value::write_signature(writer, &ty.to_string())?;
    writer.align(ty.alignment());
    value::write_value(writer, &value)?;
    Ok(())
}

fn validate_required_fields(message_type: MessageType, fields: &[HeaderField]) -> Result<()> {
    let has = |code: u8| fields.iter().any(|f| f.code() == code);

    match message_type {
        MessageType::METHOD_CALL => {
            if !has(1) {
                return Err(Error::new(ErrorKind::MissingHeaderField("PATH")));
            }
            if !has(3) {
                return Err(Error::new(ErrorKind::MissingHeaderField("MEMBER")));
            }
        }
        MessageType::METHOD_RETURN => {
            if !has(5) {
                return Err(Error::new(ErrorKind::MissingHeaderField("REPLY_SERIAL")));
            }
        }
        MessageType::ERROR => {
            if !has(4) {
                return Err(Error::new(ErrorKind::MissingHeaderField("ERROR_NAME")));
            }
            if !has(5) {
                return Err(Error::new(ErrorKind::MissingHeaderField("REPLY_SERIAL")));
            }
        }
        MessageType::SIGNAL => {
            if !has(1) {
                return Err(Error::new(ErrorKind::MissingHeaderField("PATH")));
            }
            if !has(2) {
                return Err(Error::new(ErrorKind::MissingHeaderField("INTERFACE")));
            }
            if !has(3) {
                return Err(Error::new(ErrorKind::MissingHeaderField("MEMBER")));
            }
        }
        _ => {}
    }

    Ok(())
}

/// A message not yet assigned a serial, as constructed by a caller before
/// handing it to a [`crate::Connection`] to send.
///
/// `serial` is deliberately absent here: the connection assigns it (§3,
/// "Lifecycle"), so a `Request` can never carry an inconsistent one.
#[derive(Debug, Clone)]
pub struct Request {
    /// The byte order to encode this message with.
    pub endianness: Endianness,
    /// The kind of message.
    pub message_type: MessageType,
    /// The flags bitfield.
    pub flags: Flags,
    /// The header fields, in the order they will be written.
    pub header_fields: Vec<HeaderField>,
    /// The body values. Must agree with a `Signature` header field when
    /// non-empty.
    pub body: Vec<Value>,
}

impl Request {
    fn new(message_type: MessageType) -> Self {
        Request {
            endianness: Endianness::HOST,
            message_type,
            flags: Flags::default(),
            header_fields: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Start building a `METHOD_CALL` to `member` at `path`.
    pub fn method_call(path: ObjectPath, member: impl Into<String>) -> Self {
        let mut request = Self::new(MessageType::METHOD_CALL);
        request.header_fields.push(HeaderField::Path(path));
        request.header_fields.push(HeaderField::Member(member.into()));
        request
    }

    /// Start building a `METHOD_RETURN` replying to `reply_serial`.
    pub fn method_return(reply_serial: u32) -> Self {
        let mut request = Self::new(MessageType::METHOD_RETURN);
        request
            .header_fields
            .push(HeaderField::ReplySerial(reply_serial));
        request
    }

    /// Start building an `ERROR` reply to `reply_serial`.
    pub fn error(reply_serial: u32, error_name: impl Into<String>) -> Self {
        let mut request = Self::new(MessageType::ERROR);
        request
            .header_fields
            .push(HeaderField::ReplySerial(reply_serial));
        request
            .header_fields
            .push(HeaderField::ErrorName(error_name.into()));
        request
    }

    /// Start building a `SIGNAL` named `member` on `interface`, emitted from `path`.
    pub fn signal(path: ObjectPath, interface: impl Into<String>, member: impl Into<String>) -> Self {
        let mut request = Self::new(MessageType::SIGNAL);
        request.header_fields.push(HeaderField::Path(path));
        request
            .header_fields
            .push(HeaderField::Interface(interface.into()));
        request.header_fields.push(HeaderField::Member(member.into()));
        request
    }

    /// Set the `DESTINATION` header field.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.header_fields
            .push(HeaderField::Destination(destination.into()));
        self
    }

    /// Set the `INTERFACE` header field.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.header_fields
            .push(HeaderField::Interface(interface.into()));
        self
    }

    /// Set additional flags.
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the body, deriving and attaching the matching `SIGNATURE` header
    /// field.
    pub fn with_body(mut self, body: Vec<Value>) -> Self {
        self.header_fields
            .retain(|f| !matches!(f, HeaderField::Signature(_)));

        if !body.is_empty() {
            let types: Vec<Type> = body.iter().map(Value::ty).collect();
            self.header_fields
                .push(HeaderField::Signature(Signature::from_types(types)));
        }

        self.body = body;
        self
    }
}

/// A decoded (or about-to-be-sent) D-Bus message.
///
/// Unlike [`Request`], a `Message` always carries the serial that was
/// assigned to it - either by the connection that sent it, or as read off
/// the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The byte order the message was (or will be) encoded with.
    pub endianness: Endianness,
    /// The kind of message.
    pub message_type: MessageType,
    /// The flags bitfield.
    pub flags: Flags,
    /// The message's serial number. Never zero.
    pub serial: u32,
    /// The header fields.
    pub header_fields: Vec<HeaderField>,
    /// The body values.
    pub body: Vec<Value>,
}

impl Message {
    /// The `PATH` header field, if present.
    pub fn path(&self) -> Option<&ObjectPath> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::Path(p) => Some(p),
            _ => None,
        })
    }

    /// The `INTERFACE` header field, if present.
    pub fn interface(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::Interface(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The `MEMBER` header field, if present.
    pub fn member(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::Member(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The `ERROR_NAME` header field, if present.
    pub fn error_name(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::ErrorName(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The `REPLY_SERIAL` header field, if present - the serial of the call
    /// this message answers.
    pub fn reply_to(&self) -> Option<u32> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::ReplySerial(u) => Some(*u),
            _ => None,
        })
    }

    /// The `DESTINATION` header field, if present.
    pub fn destination(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::Destination(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The `SENDER` header field, if present.
    pub fn sender(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::Sender(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The `SIGNATURE` header field, if present.
    pub fn signature(&self) -> Option<&Signature> {
        self.header_fields.iter().find_map(|f| match f {
            HeaderField::Signature(s) => Some(s),
            _ => None,
        })
    }
}

/// The outcome of attempting to decode one message from the front of a buffer.
pub(crate) enum Decoded {
    /// A complete message, and the number of bytes it occupied.
    Message(Message, usize),
    /// Not enough bytes were available; try again once more arrive.
    Incomplete,
}

/// Encode `request` into a standalone byte buffer, stamping `serial`.
///
/// The buffer always starts at writer offset 0, as required for the
/// back-patched length fields to land in the right place.
pub fn encode(request: &Request, serial: u32) -> Result<Vec<u8>> {
    if serial == 0 {
        return Err(Error::new(ErrorKind::InvalidHeader("zero serial")));
    }

    validate_required_fields(request.message_type, &request.header_fields)?;

    let declared_signature = request.header_fields.iter().find_map(|f| match f {
        HeaderField::Signature(sig) => Some(sig),
        _ => None,
    });

    match (request.body.is_empty(), declared_signature) {
        (true, _) => {}
        (false, None) => return Err(Error::new(ErrorKind::SignatureMismatch)),
        (false, Some(sig)) => {
            let actual: Vec<Type> = request.body.iter().map(Value::ty).collect();

            if sig.types() != actual.as_slice() {
                return Err(Error::new(ErrorKind::SignatureMismatch));
            }
        }
    }

    let mut writer = Writer::new(request.endianness);
    writer.write_u8(request.endianness.byte());
    writer.write_u8(request.message_type.into_raw());
    writer.write_u8(request.flags.into_raw());
    writer.write_u8(1); // protocol version

    let body_len_at = writer.reserve_u32();
    writer.write_u32(serial);

    let fields_len_at = writer.reserve_u32();
    writer.align(8);
    let fields_start = writer.position();

    for field in &request.header_fields {
        encode_header_field(&mut writer, field)?;
    }

    let fields_len = writer.position() - fields_start;
    writer.patch_u32(fields_len_at, fields_len as u32);

    writer.align(8);
    let body_start = writer.position();
    value::write_values(&mut writer, &request.body)?;
    let body_len = writer.position() - body_start;
    writer.patch_u32(body_len_at, body_len as u32);

    if writer.position() as u64 > MAX_MESSAGE_LEN {
        return Err(Error::new(ErrorKind::MessageTooLong(writer.position() as u64)));
    }

    Ok(writer.into_vec())
}

/// Decode exactly one message from `bytes`.
///
/// Fails if `bytes` does not hold a whole message, or holds more than one -
/// callers working directly from a complete in-memory buffer (tests, a
/// message captured from a packet trace) want an error in both cases rather
/// than the resumable [`Decoded`] sentinel [`decode_partial`] returns for a
/// streaming transport.
pub fn decode(bytes: &[u8]) -> Result<Message> {
    match decode_partial(bytes)? {
        Decoded::Message(message, consumed) if consumed == bytes.len() => Ok(message),
        Decoded::Message(..) => Err(Error::new(ErrorKind::InvalidHeader(
            "trailing data after message",
        ))),
        Decoded::Incomplete => Err(Error::new(ErrorKind::InvalidHeader(
            "buffer does not contain a complete message",
        ))),
    }
}

/// Attempt to decode one message from the front of `bytes`.
///
/// Returns [`Decoded::Incomplete`] rather than an error when `bytes` simply
/// does not yet hold a whole message - that sentinel is how the framed
/// decoder knows to wait for more data instead of tearing down the
/// connection.
pub(crate) fn decode_partial(bytes: &[u8]) -> Result<Decoded> {
    // byte_order, message_type, flags, protocol_version, body_length, serial.
    const PREFIX_LEN: usize = 12;

    if bytes.len() < PREFIX_LEN {
        return Ok(Decoded::Incomplete);
    }

    let endianness = Endianness::from_byte(bytes[0])
        .ok_or_else(|| Error::new(ErrorKind::InvalidByteOrder(bytes[0])))?;

    let message_type = match bytes[1] {
        1 => MessageType::METHOD_CALL,
        2 => MessageType::METHOD_RETURN,
        3 => MessageType::ERROR,
        4 => MessageType::SIGNAL,
        other => return Err(Error::new(ErrorKind::InvalidMessageType(other))),
    };

    let flags = Flags::new(bytes[2]);

    if bytes[3] != 1 {
        return Err(Error::new(ErrorKind::InvalidHeader(
            "unsupported protocol version",
        )));
    }

    let mut reader = Reader::new(bytes, endianness);
    reader.advance(4)?;
    let body_length = reader.read_u32()?;
    let serial = reader.read_u32()?;

    if serial == 0 {
        return Err(Error::new(ErrorKind::InvalidHeader("zero serial")));
    }

    if reader.remaining() < 4 {
        return Ok(Decoded::Incomplete);
    }

    let fields_length = reader.read_u32()?;

    if (fields_length as u64) + (body_length as u64) + PREFIX_LEN as u64 + 4 > MAX_MESSAGE_LEN {
        return Err(Error::new(ErrorKind::MessageTooLong(
            fields_length as u64 + body_length as u64,
        )));
    }

    reader.align(8)?;

    if reader.remaining() < fields_length as usize {
        return Ok(Decoded::Incomplete);
    }

    let fields_start = reader.absolute_position();
    let fields_length = fields_length as usize;
    let mut header_fields = Vec::new();

    while reader.absolute_position() - fields_start < fields_length {
        reader.align(8)?;
        let code = reader.read_u8()?;
        let sig = value::read_signature(&mut reader)?;
        let ty = Signature::single_type(sig.as_str())?;
        let value = value::read_value(&mut reader, &ty)?;
        header_fields.push(decode_header_field(code, value)?);
    }

    if reader.absolute_position() - fields_start != fields_length {
        return Err(Error::new(ErrorKind::InvalidHeader(
            "header fields region did not align to declared length",
        )));
    }

    reader.align(8)?;

    if reader.remaining() < body_length as usize {
        return Ok(Decoded::Incomplete);
    }

    let signature = header_fields.iter().find_map(|f| match f {
        HeaderField::Signature(sig) => Some(sig.clone()),
        _ => None,
    });

    if body_length != 0 && signature.is_none() {
        return Err(Error::new(ErrorKind::MissingHeaderField("SIGNATURE")));
    }

    let body_types: Vec<Type> = signature
        .as_ref()
        .map(|s| s.types().to_vec())
        .unwrap_or_default();

    let body_start = reader.absolute_position();
    let body = value::read_values(&mut reader, &body_types)?;

    if reader.absolute_position() - body_start != body_length as usize {
        return Err(Error::new(ErrorKind::InvalidHeader(
            "body did not consume the declared body length",
        )));
    }

    validate_required_fields(message_type, &header_fields)?;

    let message = Message {
        endianness,
        message_type,
        flags,
        serial,
        header_fields,
        body,
    };

    Ok(Decoded::Message(message, reader.position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_method_return_encodes_and_decodes() {
        let request = Request::method_return(2)
            .with_flags(Flags::NO_REPLY_EXPECTED)
            .with_body(vec![Value::Boolean(true)]);
        let request = Request {
            endianness: Endianness::Little,
            ..request
        };

        let bytes = encode(&request, 3).unwrap();

        assert_eq!(
            &bytes[..12],
            &[0x6C, 0x02, 0x01, 0x01, 0x04, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00]
        );

        let message = decode(&bytes).unwrap();
        assert_eq!(message.serial, 3);
        assert_eq!(message.reply_to(), Some(2));
        assert_eq!(message.body, vec![Value::Boolean(true)]);
    }

    #[test]
    fn properties_get_call_round_trips_with_signature() {
        let request = Request::method_call(
            ObjectPath::new("/org/freedesktop/NetworkManager/AccessPoint/1").unwrap(),
            "Get",
        )
        .with_destination("org.freedesktop.NetworkManager")
        .with_body(vec![
            Value::str("org.freedesktop.NetworkManager.AccessPoint"),
            Value::str("Ssid"),
        ]);

        let bytes = encode(&request, 9).unwrap();

        let message = decode(&bytes).unwrap();
        assert_eq!(message.body, request.body);
        assert_eq!(message.signature().unwrap().as_str(), "ss");
    }

    #[test]
    fn hello_reply_then_name_acquired_signal_decode_in_sequence() {
        let reply = Request::method_return(1)
            .with_body(vec![Value::str(":1.66")]);
        let reply_bytes = encode(&reply, 1).unwrap();

        let signal = Request::signal(
            ObjectPath::new("/org/freedesktop/DBus").unwrap(),
            "org.freedesktop.DBus",
            "NameAcquired",
        )
        .with_body(vec![Value::str(":1.66")]);
        let signal_bytes = encode(&signal, 2).unwrap();

        let mut combined = reply_bytes.clone();
        combined.extend_from_slice(&signal_bytes);

        let (first, consumed) = match decode_partial(&combined).unwrap() {
            Decoded::Message(message, consumed) => (message, consumed),
            Decoded::Incomplete => panic!("expected a complete message"),
        };
        assert_eq!(first.message_type, MessageType::METHOD_RETURN);
        assert_eq!(first.serial, 1);
        assert_eq!(first.reply_to(), Some(1));
        assert_eq!(first.body, vec![Value::str(":1.66")]);

        let second = decode(&combined[consumed..]).unwrap();
        assert_eq!(second.message_type, MessageType::SIGNAL);
        assert_eq!(second.path().unwrap().as_str(), "/org/freedesktop/DBus");
        assert_eq!(second.interface(), Some("org.freedesktop.DBus"));
        assert_eq!(second.member(), Some("NameAcquired"));
        assert_eq!(second.body, vec![Value::str(":1.66")]);
    }

    #[test]
    fn every_split_of_a_two_message_stream_resolves_via_the_framed_decoder() {
        use crate::frame::FrameDecoder;

        let reply = Request::method_return(1).with_body(vec![Value::str(":1.66")]);
        let reply_bytes = encode(&reply, 1).unwrap();

        let signal = Request::signal(
            ObjectPath::new("/org/freedesktop/DBus").unwrap(),
            "org.freedesktop.DBus",
            "NameAcquired",
        )
        .with_body(vec![Value::str(":1.66")]);
        let signal_bytes = encode(&signal, 2).unwrap();

        let mut combined = reply_bytes;
        combined.extend_from_slice(&signal_bytes);

        for split in 1..combined.len() {
            let mut decoder = FrameDecoder::new();
            decoder.push(&combined[..split]);
            let mut messages = Vec::new();

            while let Some(message) = decoder.decode_next().unwrap() {
                messages.push(message);
            }

            decoder.push(&combined[split..]);

            while let Some(message) = decoder.decode_next().unwrap() {
                messages.push(message);
            }

            assert_eq!(messages.len(), 2, "split at {split} lost a message");
            assert_eq!(messages[0].serial, 1);
            assert_eq!(messages[1].serial, 2);
        }
    }

    #[test]
    fn missing_required_fields_rejected() {
        let request = Request::new(MessageType::METHOD_CALL);
        assert!(encode(&request, 1).is_err());
    }

    #[test]
    fn truncated_prefix_is_incomplete() {
        assert!(matches!(
            decode_partial(&[0x6C, 0x01]).unwrap(),
            Decoded::Incomplete
        ));
        assert!(decode(&[0x6C, 0x01]).is_err());
    }

    #[test]
    fn zero_serial_is_fatal() {
        let mut bytes = vec![0x6C, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        bytes[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(decode(&bytes).is_err());
    }
}
