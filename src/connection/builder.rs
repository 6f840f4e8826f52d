use crate::error::Result;
use crate::sasl::AuthType;

use super::Connection;

/// Options governing how [`Connection::connect`] performs its handshake.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub(crate) auth: AuthType,
    pub(crate) hello: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            auth: default_auth(),
            hello: true,
        }
    }
}

#[cfg(feature = "libc")]
fn default_auth() -> AuthType {
    AuthType::external_current_uid()
}

#[cfg(not(feature = "libc"))]
fn default_auth() -> AuthType {
    AuthType::Anonymous
}

/// Builds a [`Connection`], choosing an authentication mechanism and
/// whether to perform the `Hello` bootstrap automatically.
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    options: ConnectOptions,
}

impl ConnectionBuilder {
    /// Start from the default options: `EXTERNAL` authentication using the
    /// current UID when the `libc` feature is enabled, `ANONYMOUS`
    /// otherwise, and an automatic `Hello` call.
    pub fn new() -> Self {
        ConnectionBuilder {
            options: ConnectOptions::default(),
        }
    }

    /// Use `AUTH ANONYMOUS` instead of asserting a UID.
    pub fn anonymous(mut self) -> Self {
        self.options.auth = AuthType::Anonymous;
        self
    }

    /// Use `AUTH EXTERNAL` with an explicit identity, bypassing the `libc`
    /// UID lookup.
    pub fn external(mut self, identity: impl Into<String>) -> Self {
        self.options.auth = AuthType::External(identity.into());
        self
    }

    /// Skip the automatic `Hello` bootstrap call.
    ///
    /// [`Connection::unique_name`] will remain `None` until the caller
    /// issues `Hello` itself.
    pub fn no_hello(mut self) -> Self {
        self.options.hello = false;
        self
    }

    /// Finish the handshake over an already-connected transport.
    pub async fn connect<T>(self, transport: T) -> Result<Connection<T>>
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        Connection::connect(transport, self.options).await
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "tokio", unix))]
mod unix_bus {
    use tokio::net::UnixStream;

    use crate::error::Result;

    use super::super::address;
    use super::{Connection, ConnectionBuilder};

    impl ConnectionBuilder {
        /// Connect to the session bus named by `DBUS_SESSION_BUS_ADDRESS`.
        pub async fn session_bus(self) -> Result<Connection<UnixStream>> {
            let path = address::session_bus_path()?;
            let stream = UnixStream::connect(path).await?;
            self.connect(stream).await
        }

        /// Connect to the system bus named by `DBUS_SYSTEM_BUS_ADDRESS`, or
        /// the well-known default socket if that variable is unset.
        pub async fn system_bus(self) -> Result<Connection<UnixStream>> {
            let path = address::system_bus_path()?;
            let stream = UnixStream::connect(path).await?;
            self.connect(stream).await
        }
    }
}
