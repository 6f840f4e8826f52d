//! Resolving a D-Bus server address string to something we can dial.
//!
//! Only the `unix:path=...` form is supported - abstract sockets and the
//! other transports the specification allows (`tcp:`, `nonce-tcp:`,
//! `launchd:`) are not; this crate only ever dials a concrete filesystem
//! path.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, ErrorKind, Result};

const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// Resolve the session bus's socket path from `DBUS_SESSION_BUS_ADDRESS`.
pub(crate) fn session_bus_path() -> Result<PathBuf> {
    let address = env::var(ENV_SESSION_BUS).map_err(|_| Error::new(ErrorKind::MissingBus))?;
    parse_unix_path(&address)
}

/// Resolve the system bus's socket path, falling back to the well-known
/// default when `DBUS_SYSTEM_BUS_ADDRESS` is unset.
pub(crate) fn system_bus_path() -> Result<PathBuf> {
    let address =
        env::var(ENV_SYSTEM_BUS).unwrap_or_else(|_| DEFAULT_SYSTEM_BUS.to_owned());
    parse_unix_path(&address)
}

fn parse_unix_path(address: &str) -> Result<PathBuf> {
    // A real address may list several `;`-separated alternatives; take the
    // first one, matching how most clients behave in practice.
    let first = address.split(';').next().unwrap_or_default();

    let Some(rest) = first.strip_prefix("unix:") else {
        return Err(Error::new(ErrorKind::InvalidAddress(address.to_owned())));
    };

    for entry in rest.split(',') {
        if let Some(path) = entry.strip_prefix("path=") {
            return Ok(PathBuf::from(path));
        }
    }

    Err(Error::new(ErrorKind::InvalidAddress(address.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_key() {
        let path = parse_unix_path("unix:path=/run/user/1000/bus").unwrap();
        assert_eq!(path, PathBuf::from("/run/user/1000/bus"));
    }

    #[test]
    fn takes_first_of_several_alternatives() {
        let path = parse_unix_path("unix:path=/one;unix:path=/two").unwrap();
        assert_eq!(path, PathBuf::from("/one"));
    }

    #[test]
    fn rejects_non_unix_transports() {
        assert!(parse_unix_path("tcp:host=localhost,port=1234").is_err());
    }
}
