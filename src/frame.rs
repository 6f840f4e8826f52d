//! Framing of the binary message stream: accumulating bytes from a
//! transport and splitting off complete messages as they become available.
//!
//! D-Bus messages are not themselves length-prefixed at a fixed offset -
//! [`crate::message::decode`] has to inspect the header to know how much of
//! the buffer it needs - so a [`FrameDecoder`] exists to make that decode
//! resumable across partial reads from an async transport.

use crate::error::{Error, ErrorKind, Result};
use crate::message::{self, Decoded, Message, MAX_MESSAGE_LEN};

/// Accumulates bytes from a transport and yields complete [`Message`]s.
///
/// Bytes that do not yet form a whole message are retained across calls to
/// [`push`](Self::push) / [`decode_next`](Self::decode_next); a truncated
/// read never loses data, it just delays decoding until the rest arrives.
#[derive(Debug, Default)]
pub(crate) struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub(crate) fn new() -> Self {
        FrameDecoder { buf: Vec::new() }
    }

    /// Append freshly read bytes to the internal buffer.
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// `true` if no bytes are currently buffered.
    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Attempt to decode and remove one complete message from the front of
    /// the buffer.
    ///
    /// Returns `Ok(None)` when the buffer holds the start of a message but
    /// not all of it yet - the caller should read more from the transport
    /// and call this again. An oversized in-flight message is rejected with
    /// [`ErrorKind::MessageTooLong`] rather than being allowed to grow the
    /// buffer without bound.
    pub(crate) fn decode_next(&mut self) -> Result<Option<Message>> {
        if self.buf.len() as u64 > MAX_MESSAGE_LEN {
            return Err(Error::new(ErrorKind::MessageTooLong(self.buf.len() as u64)));
        }

        match message::decode_partial(&self.buf)? {
            Decoded::Message(message, consumed) => {
                self.buf.drain(..consumed);
                Ok(Some(message))
            }
            Decoded::Incomplete => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{encode, Request};
    use crate::ty::Endianness;
    use crate::value::Value;

    #[test]
    fn decodes_once_a_full_message_arrives() {
        let request = Request::method_return(1).with_body(vec![Value::UInt32(7)]);
        let request = Request {
            endianness: Endianness::Little,
            ..request
        };
        let bytes = encode(&request, 5).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes[..bytes.len() - 1]);
        assert!(decoder.decode_next().unwrap().is_none());

        decoder.push(&bytes[bytes.len() - 1..]);
        let message = decoder.decode_next().unwrap().unwrap();
        assert_eq!(message.serial, 5);
        assert!(decoder.is_empty());
    }

    #[test]
    fn splits_two_back_to_back_messages() {
        let first = {
            let request = Request::method_return(1).with_body(vec![Value::Byte(1)]);
            let request = Request {
                endianness: Endianness::Little,
                ..request
            };
            encode(&request, 2).unwrap()
        };
        let second = {
            let request = Request::method_return(1).with_body(vec![Value::Byte(2)]);
            let request = Request {
                endianness: Endianness::Little,
                ..request
            };
            encode(&request, 3).unwrap()
        };

        let mut decoder = FrameDecoder::new();
        decoder.push(&first);
        decoder.push(&second);

        let a = decoder.decode_next().unwrap().unwrap();
        let b = decoder.decode_next().unwrap().unwrap();
        assert_eq!(a.serial, 2);
        assert_eq!(b.serial, 3);
        assert!(decoder.is_empty());
    }

    #[test]
    fn byte_at_a_time_still_resolves() {
        let request = Request::method_return(1).with_body(vec![Value::str("chunked")]);
        let request = Request {
            endianness: Endianness::Little,
            ..request
        };
        let bytes = encode(&request, 9).unwrap();

        let mut decoder = FrameDecoder::new();
        let mut result = None;

        for byte in &bytes {
            decoder.push(std::slice::from_ref(byte));

            if let Some(message) = decoder.decode_next().unwrap() {
                result = Some(message);
                break;
            }
        }

        assert_eq!(result.unwrap().serial, 9);
    }
}
