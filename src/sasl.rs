//! The SASL line protocol D-Bus uses to authenticate a freshly opened
//! transport before switching over to binary message framing.
//!
//! Every line in this protocol is `\r\n`-terminated ASCII. These helpers are
//! deliberately sans-io: they build the bytes to send and parse the bytes
//! received, leaving the actual I/O to [`crate::connection::Connection`].

use crate::error::{Error, ErrorKind, Result};

/// The authentication mechanism to offer the server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthType {
    /// `AUTH ANONYMOUS`, carrying no credentials.
    Anonymous,
    /// `AUTH EXTERNAL <hex>`, asserting the given Unix UID as a decimal
    /// string hex-encoded per the SASL EXTERNAL mechanism.
    External(String),
}

impl AuthType {
    /// `EXTERNAL` authentication asserting the calling process's UID.
    ///
    /// Requires the `libc` feature; without it, using this variant fails at
    /// connect time with [`ErrorKind::UnsupportedAuthUid`].
    #[cfg(feature = "libc")]
    pub fn external_current_uid() -> Self {
        let uid = unsafe { libc::getuid() };
        AuthType::External(uid.to_string())
    }
}

/// Render the initial `AUTH` line for `auth`.
///
/// D-Bus requires the connection to send a single NUL byte before the first
/// SASL command; that byte is the caller's responsibility, not this
/// function's, since it is only ever sent once per transport regardless of
/// which mechanism is chosen.
pub(crate) fn auth_line(auth: &AuthType) -> Vec<u8> {
    match auth {
        AuthType::Anonymous => b"AUTH ANONYMOUS\r\n".to_vec(),
        AuthType::External(uid) => {
            let mut line = b"AUTH EXTERNAL ".to_vec();
            line.extend(hex_encode(uid.as_bytes()));
            line.extend(b"\r\n");
            line
        }
    }
}

/// The `BEGIN` line that ends negotiation and switches the transport to
/// binary message framing.
pub(crate) fn begin_line() -> &'static [u8] {
    b"BEGIN\r\n"
}

fn hex_encode(bytes: &[u8]) -> Vec<u8> {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = Vec::with_capacity(bytes.len() * 2);

    for &b in bytes {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0xf) as usize]);
    }

    out
}

/// A parsed server response to an `AUTH` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ServerResponse {
    /// `OK <guid>` - authentication succeeded.
    Ok(String),
    /// `REJECTED <mechanisms>` - the offered mechanism was refused.
    Rejected(Vec<String>),
}

/// Parse one `\r\n`-terminated line received during negotiation.
///
/// `line` must already have its trailing `\r\n` stripped.
pub(crate) fn parse_server_line(line: &[u8]) -> Result<ServerResponse> {
    let line = std::str::from_utf8(line)?;
    let mut words = line.split(' ').filter(|s| !s.is_empty());

    match words.next() {
        Some("OK") => {
            let guid = words.next().unwrap_or_default().to_owned();
            Ok(ServerResponse::Ok(guid))
        }
        Some("REJECTED") => {
            let mechs = words.map(str::to_owned).collect();
            Ok(ServerResponse::Rejected(mechs))
        }
        _ => Err(Error::new(ErrorKind::InvalidSaslResponse(line.to_owned()))),
    }
}

/// Find the index just past a `\r\n`-terminated line at the front of `buf`,
/// if a complete one is present.
pub(crate) fn find_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n").map(|i| i + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_auth_line() {
        assert_eq!(auth_line(&AuthType::Anonymous), b"AUTH ANONYMOUS\r\n");
    }

    #[test]
    fn external_auth_line_hex_encodes_uid() {
        let line = auth_line(&AuthType::External("1000".to_owned()));
        assert_eq!(line, b"AUTH EXTERNAL 31303030\r\n");
    }

    #[test]
    fn parses_ok_with_guid() {
        let response = parse_server_line(b"OK 1234deadbeef").unwrap();
        assert_eq!(response, ServerResponse::Ok("1234deadbeef".to_owned()));
    }

    #[test]
    fn parses_rejected_with_mechanisms() {
        let response = parse_server_line(b"REJECTED EXTERNAL ANONYMOUS").unwrap();
        assert_eq!(
            response,
            ServerResponse::Rejected(vec!["EXTERNAL".to_owned(), "ANONYMOUS".to_owned()])
        );
    }

    #[test]
    fn unrecognized_line_is_an_error() {
        assert!(parse_server_line(b"DATA 123").is_err());
    }

    #[test]
    fn find_line_locates_terminator() {
        assert_eq!(find_line(b"OK abc\r\nmore"), Some(8));
        assert_eq!(find_line(b"incomplete"), None);
    }
}
