use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::frame::FrameDecoder;
use crate::message::{self, Flags, Message, MessageType, Request};
use crate::object_path::ObjectPath;
use crate::sasl::{self, AuthType, ServerResponse};
use crate::value::Value;

use super::ConnectOptions;

type Waiters = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Message>>>>>;

/// An open, authenticated D-Bus connection over `T`.
///
/// `T` may be any ordered, reliable, byte-stream transport - a Unix domain
/// socket is what a real bus speaks, but nothing here assumes one. Reading
/// happens on a background task so that [`call`](Self::call) can wait for
/// its specific reply while unrelated signals and other in-flight calls'
/// replies keep flowing; [`incoming`](Self::incoming) drains everything the
/// background task did not hand to a waiting call.
pub struct Connection<T> {
    write_half: WriteHalf<T>,
    serial: u32,
    waiters: Waiters,
    incoming_rx: mpsc::UnboundedReceiver<Result<Message>>,
    reader_task: JoinHandle<()>,
    unique_name: Option<String>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Perform the SASL handshake over `transport` and, if
    /// [`ConnectOptions::hello`] is set, the initial `Hello` call, producing
    /// a ready-to-use connection.
    pub async fn connect(mut transport: T, options: ConnectOptions) -> Result<Self> {
        let leftover = handshake(&mut transport, &options.auth).await?;
        debug!("SASL handshake complete, {} bytes carried over", leftover.len());

        let (read_half, write_half) = io::split(transport);
        let waiters: Waiters = Arc::new(Mutex::new(HashMap::new()));
        let (tx, incoming_rx) = mpsc::unbounded_channel();

        let reader_task = tokio::spawn(reader_loop(read_half, leftover, waiters.clone(), tx));

        let mut connection = Connection {
            write_half,
            serial: 0,
            waiters,
            incoming_rx,
            reader_task,
            unique_name: None,
        };

        if options.hello {
            connection.hello().await?;
        }

        Ok(connection)
    }

    /// Call `org.freedesktop.DBus.Hello`, the mandatory first call on a
    /// fresh connection, and remember the unique bus name the broker
    /// assigns in reply.
    async fn hello(&mut self) -> Result<()> {
        let request = Request::method_call(ObjectPath::new(crate::freedesktop::PATH)?, "Hello")
            .with_destination(crate::freedesktop::DESTINATION)
            .with_interface(crate::freedesktop::INTERFACE);

        let reply = self
            .call(request)
            .await?
            .ok_or_else(|| Error::new(ErrorKind::HandshakeFailed))?;

        let name = match reply.body.first() {
            Some(Value::String(name)) => name.clone(),
            _ => return Err(Error::new(ErrorKind::HandshakeFailed)),
        };

        self.unique_name = Some(name);
        Ok(())
    }

    /// The unique bus name assigned by `Hello`, if it was called.
    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    fn next_serial(&mut self) -> u32 {
        self.serial = self.serial.wrapping_add(1);

        if self.serial == 0 {
            self.serial = 1;
        }

        self.serial
    }

    /// Send `request` without waiting for a reply, returning the serial it
    /// was sent with.
    pub async fn send(&mut self, request: Request) -> Result<u32> {
        let serial = self.next_serial();
        let bytes = message::encode(&request, serial)?;
        trace!(serial, "sending message with no reply expected");
        self.write_half.write_all(&bytes).await?;
        Ok(serial)
    }

    /// Send `request` and wait for its matching `METHOD_RETURN` or `ERROR`.
    ///
    /// If `request` carries [`Flags::NO_REPLY_EXPECTED`], no waiter is
    /// registered and this returns `Ok(None)` as soon as the bytes are
    /// written - the bus was told not to reply, so waiting for one would
    /// hang forever. Otherwise an `ERROR` reply is surfaced as
    /// [`ErrorKind::RemoteError`] rather than as an `Ok(Some(Message))`
    /// whose type happens to be `ERROR`, so callers can use `?` without
    /// checking `message_type` themselves.
    pub async fn call(&mut self, request: Request) -> Result<Option<Message>> {
        let no_reply = request.flags.contains(Flags::NO_REPLY_EXPECTED);
        let serial = self.next_serial();

        if no_reply {
            let bytes = message::encode(&request, serial)?;
            trace!(serial, "sending call with no reply expected");
            self.write_half.write_all(&bytes).await?;
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        self.waiters.lock().unwrap().insert(serial, tx);

        let bytes = match message::encode(&request, serial) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.waiters.lock().unwrap().remove(&serial);
                return Err(err);
            }
        };

        trace!(serial, "sending call, awaiting reply");

        if let Err(err) = self.write_half.write_all(&bytes).await {
            self.waiters.lock().unwrap().remove(&serial);
            return Err(err.into());
        }

        let message = rx.await.map_err(|_| Error::new(ErrorKind::Cancelled))??;

        if message.message_type == MessageType::ERROR {
            let name = message.error_name().unwrap_or_default().to_owned();
            let body = message.body.clone();
            return Err(Error::new(ErrorKind::RemoteError { name, body }));
        }

        Ok(Some(message))
    }

    /// Wait for the next message that was not claimed by an outstanding
    /// [`call`](Self::call) - a signal, an unsolicited method call, or an
    /// `ERROR`/`METHOD_RETURN` whose caller already gave up.
    pub async fn recv(&mut self) -> Result<Message> {
        match self.incoming_rx.recv().await {
            Some(result) => result,
            None => Err(Error::new(ErrorKind::NotConnected)),
        }
    }

    /// A stream over every message [`recv`](Self::recv) would yield.
    pub fn incoming(&mut self) -> Incoming<'_> {
        Incoming {
            rx: &mut self.incoming_rx,
        }
    }

    /// Shut down the background reader and drop the connection.
    ///
    /// Any `call` still waiting on a reply resolves with
    /// [`ErrorKind::Cancelled`].
    pub fn close(self) {
        self.reader_task.abort();
        cancel_waiters(&self.waiters);
    }
}

/// The stream returned by [`Connection::incoming`].
pub struct Incoming<'a> {
    rx: &'a mut mpsc::UnboundedReceiver<Result<Message>>,
}

impl<'a> tokio_stream::Stream for Incoming<'a> {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Perform the line-based SASL exchange, returning any binary message bytes
/// that were read past the terminating `OK` line.
async fn handshake<T>(transport: &mut T, auth: &AuthType) -> Result<Vec<u8>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut out = vec![0u8];
    out.extend(sasl::auth_line(auth));
    transport.write_all(&out).await?;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];

    loop {
        if let Some(end) = sasl::find_line(&buf) {
            let line = &buf[..end - 2];

            match sasl::parse_server_line(line)? {
                ServerResponse::Ok(_guid) => {
                    buf.drain(..end);
                    break;
                }
                ServerResponse::Rejected(mechs) => {
                    return Err(Error::new(ErrorKind::AuthRejected(mechs)));
                }
            }
        }

        let n = transport.read(&mut chunk).await?;

        if n == 0 {
            return Err(Error::new(ErrorKind::HandshakeFailed));
        }

        buf.extend_from_slice(&chunk[..n]);
    }

    transport.write_all(sasl::begin_line()).await?;
    Ok(buf)
}

async fn reader_loop<T>(
    mut read_half: ReadHalf<T>,
    leftover: Vec<u8>,
    waiters: Waiters,
    tx: mpsc::UnboundedSender<Result<Message>>,
) where
    T: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::new();
    decoder.push(&leftover);
    let mut buf = [0u8; 4096];

    loop {
        loop {
            match decoder.decode_next() {
                Ok(Some(message)) => dispatch(message, &waiters, &tx),
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "closing connection after a framing error");
                    let _ = tx.send(Err(err));
                    cancel_waiters(&waiters);
                    return;
                }
            }
        }

        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("transport closed by peer");
                let _ = tx.send(Err(Error::new(ErrorKind::NotConnected)));
                cancel_waiters(&waiters);
                return;
            }
            Ok(n) => decoder.push(&buf[..n]),
            Err(err) => {
                warn!(%err, "closing connection after a read error");
                let _ = tx.send(Err(err.into()));
                cancel_waiters(&waiters);
                return;
            }
        }
    }
}

/// Resolve every pending [`Connection::call`] waiter with
/// [`ErrorKind::Cancelled`], as shutdown requires - the sender is dropped
/// unsent otherwise, which a waiting `call` sees as [`ErrorKind::NotConnected`]
/// instead.
fn cancel_waiters(waiters: &Waiters) {
    for (_, sender) in waiters.lock().unwrap().drain() {
        let _ = sender.send(Err(Error::new(ErrorKind::Cancelled)));
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use crate::connection::ConnectionBuilder;

    use super::*;

    async fn read_line(server: &mut DuplexStream) -> String {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            server.read_exact(&mut byte).await.unwrap();
            buf.push(byte[0]);

            if buf.ends_with(b"\r\n") {
                return String::from_utf8(buf).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn external_auth_happy_path_flushes_begin_and_authenticates() {
        let (client, mut server) = tokio::io::duplex(4096);

        let connecting = tokio::spawn(async move {
            ConnectionBuilder::new()
                .external("1000")
                .no_hello()
                .connect(client)
                .await
        });

        let mut nul = [0u8; 1];
        server.read_exact(&mut nul).await.unwrap();
        assert_eq!(nul[0], 0);

        let auth_line = read_line(&mut server).await;
        assert_eq!(auth_line, "AUTH EXTERNAL 31303030\r\n");

        server.write_all(b"OK 1234deadbeef\r\n").await.unwrap();

        let begin_line = read_line(&mut server).await;
        assert_eq!(begin_line, "BEGIN\r\n");

        let connection = connecting.await.unwrap().unwrap();
        assert!(connection.unique_name().is_none());
    }

    #[tokio::test]
    async fn rejected_auth_never_reaches_authenticated() {
        let (client, mut server) = tokio::io::duplex(4096);

        let connecting = tokio::spawn(async move {
            ConnectionBuilder::new()
                .external("1000")
                .no_hello()
                .connect(client)
                .await
        });

        let mut nul = [0u8; 1];
        server.read_exact(&mut nul).await.unwrap();
        let _ = read_line(&mut server).await;

        server
            .write_all(b"REJECTED DBUS_COOKIE_SHA1\r\n")
            .await
            .unwrap();

        let result = connecting.await.unwrap();
        let err = result.unwrap_err();
        assert!(err.is_auth_rejected());
    }
}

fn dispatch(message: Message, waiters: &Waiters, tx: &mpsc::UnboundedSender<Result<Message>>) {
    trace!(
        serial = message.serial,
        message_type = ?message.message_type,
        "received message"
    );

    if let Some(reply_to) = message.reply_to() {
        let sender = waiters.lock().unwrap().remove(&reply_to);

        if let Some(sender) = sender {
            // The caller may have stopped polling; a failed send just means
            // the reply is discarded, same as if it never arrived.
            let _ = sender.send(Ok(message));
            return;
        }

        warn!(reply_to, "reply has no matching waiter");
    }

    let _ = tx.send(Ok(message));
}
