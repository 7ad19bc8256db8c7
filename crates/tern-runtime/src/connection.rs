//! Plaintext connection driver.
//!
//! One [`Connection`] drives one network: it connects to the first
//! reachable server, frames lines with [`LinesCodec`], and turns traffic
//! into events on the network's dispatchers:
//!
//! ```text
//! socket line ──► raw_line ──► Message::parse ──► message ──► messages().dispatch
//!                    │ Eat                           │ Eat
//!                    └── stop                        └── stop
//! ```
//!
//! Outbound lines queued on the [`NetworkContext`] are written as they
//! arrive. There is no reconnection: when the socket closes, `disconnected`
//! is dispatched and the driver returns.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use tern_core::{Message, NetworkContext, NetworkEvent, Outcome, Outgoing, OutgoingReceiver};

use crate::error::{ConnectionError, ConnectionResult};

/// Longest accepted inbound line: 8191 bytes of tags plus 512 of message.
pub const MAX_LINE_LENGTH: usize = 8191 + 512;

type LineSink = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// Connection driver of one network.
pub struct Connection {
    context: Arc<NetworkContext>,
    outbound: OutgoingReceiver,
    shutdown: CancellationToken,
}

impl Connection {
    /// Creates a driver for `context`, draining its outbound queue.
    pub fn new(
        context: Arc<NetworkContext>,
        outbound: OutgoingReceiver,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            context,
            outbound,
            shutdown,
        }
    }

    /// Connects and runs until the socket closes, the context requests a
    /// close, or `shutdown` is cancelled.
    ///
    /// Fails only if no server accepts the connection. Errors after
    /// `connected` are reported through the `disconnected` event.
    pub async fn run(mut self) -> ConnectionResult<()> {
        let span = info_span!("connection", network = %self.context.name());
        async move {
            let stream = self.connect().await?;
            let result = self.drive(stream).await;

            let cause = match result {
                Ok(()) => {
                    info!("Disconnected");
                    None
                }
                Err(err) => {
                    error!(error = %err, "Connection lost");
                    Some(anyhow::Error::new(err))
                }
            };
            self.context
                .events()
                .dispatch(NetworkEvent::disconnected(cause))
                .await;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn connect(&self) -> ConnectionResult<TcpStream> {
        for server in self.context.config().servers() {
            if server.ssl {
                error!(%server, "TLS connections are not supported, skipping server");
                continue;
            }
            debug!(%server, "Connecting");
            match TcpStream::connect((server.host.as_str(), server.port)).await {
                Ok(stream) => {
                    info!(%server, "Connected");
                    return Ok(stream);
                }
                Err(err) => warn!(%server, error = %err, "Connection attempt failed"),
            }
        }
        Err(ConnectionError::Exhausted {
            network: self.context.name().to_owned(),
        })
    }

    async fn drive(&mut self, stream: TcpStream) -> ConnectionResult<()> {
        let (reader, writer) = stream.into_split();
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        self.context
            .events()
            .dispatch(NetworkEvent::connected())
            .await;

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    debug!("Shutdown requested");
                    return self.close(&mut sink, None).await;
                }
                item = self.outbound.recv() => match item {
                    Some(Outgoing::Line(line)) => write_line(&mut sink, &line).await?,
                    Some(Outgoing::Close(reason)) => {
                        return self.close(&mut sink, reason).await;
                    }
                    None => return Ok(()),
                },
                line = lines.next() => match line {
                    Some(Ok(line)) => self.handle_line(line).await,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!(max = MAX_LINE_LENGTH, "Discarding overlong line");
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                },
            }
        }
    }

    async fn handle_line(&self, line: String) {
        if line.is_empty() {
            return;
        }
        trace!(%line, "<<");

        let events = self.context.events();
        if events.dispatch(NetworkEvent::raw_line(line.as_str())).await == Outcome::Eat {
            return;
        }

        let message = Arc::new(Message::parse(&line));
        if events
            .dispatch(NetworkEvent::message(Arc::clone(&message)))
            .await
            == Outcome::Eat
        {
            return;
        }
        self.context.messages().dispatch(message).await;
    }

    /// Dispatches `close_request`, flushes what its handlers queued, then
    /// quits.
    async fn close(&mut self, sink: &mut LineSink, reason: Option<String>) -> ConnectionResult<()> {
        self.context
            .events()
            .dispatch(NetworkEvent::close_request())
            .await;

        while let Ok(item) = self.outbound.try_recv() {
            if let Outgoing::Line(line) = item {
                write_line(sink, &line).await?;
            }
        }

        let quit = match Message::new("QUIT", reason).to_line() {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "Quit reason cannot be sent, quitting without it");
                "QUIT".to_owned()
            }
        };
        write_line(sink, &quit).await?;
        SinkExt::<String>::close(sink).await?;
        Ok(())
    }
}

/// Writes one line with CRLF; the codec only appends LF.
async fn write_line(sink: &mut LineSink, line: &str) -> ConnectionResult<()> {
    trace!(%line, ">>");
    sink.send(format!("{line}\r")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;
    use tern_core::{
        GlobalEvent, GlobalEventDispatcher, NetworkArgs, NetworkConfig, NetworkEventName, Plugin,
        Priority, handler_fn,
    };
    use tern_plugins::CorePlugin;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn context(servers: serde_json::Value) -> (Arc<NetworkContext>, OutgoingReceiver) {
        let section = json!({
            "nick": "tern",
            "user": "tern",
            "realname": "Tern Test",
            "servers": servers,
        });
        NetworkContext::new(NetworkConfig::new("local", section, None).unwrap())
    }

    fn record(ctx: &NetworkContext, seen: &Arc<Mutex<Vec<String>>>) {
        for name in [
            NetworkEventName::Connected,
            NetworkEventName::Disconnected,
            NetworkEventName::CloseRequest,
        ] {
            let seen = Arc::clone(seen);
            let handler = handler_fn("record", move |(_, value): NetworkArgs| {
                let seen = Arc::clone(&seen);
                async move {
                    let suffix = if value.as_error().is_some() { "!" } else { "" };
                    seen.lock().push(format!("{}{suffix}", name.as_str()));
                }
            });
            ctx.events().register(name, handler, Priority::DEFAULT).unwrap();
        }
    }

    #[tokio::test]
    async fn test_session_with_core_plugin() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (ctx, outbound) = context(json!([
            "127.0.0.1:+6697",
            format!("127.0.0.1:{port}"),
        ]));
        let global = GlobalEventDispatcher::new();
        CorePlugin::new().load(&global).await.unwrap();
        global
            .dispatch(GlobalEvent::InitNetworkContext(Arc::clone(&ctx)))
            .await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        record(&ctx, &seen);

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            let mut reader = BufReader::new(reader).lines();
            let mut received = Vec::new();

            for _ in 0..2 {
                received.push(reader.next_line().await.unwrap().unwrap());
            }
            writer.write_all(b"PING :irc.local\r\n").await.unwrap();
            received.push(reader.next_line().await.unwrap().unwrap());
            (reader, writer, received)
        });

        let connection = Connection::new(Arc::clone(&ctx), outbound, CancellationToken::new());
        let driver = tokio::spawn(connection.run());

        let (mut reader, _writer, received) = timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            received,
            ["NICK tern", "USER tern 0 * :Tern Test", "PONG irc.local"]
        );

        ctx.request_close(Some("bye")).unwrap();
        let quit = timeout(Duration::from_secs(5), reader.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quit.as_deref(), Some("QUIT bye"));

        timeout(Duration::from_secs(5), driver)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(*seen.lock(), ["connected", "close_request", "disconnected"]);
    }

    #[tokio::test]
    async fn test_eaten_raw_line_is_not_parsed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (ctx, outbound) = context(json!([format!("127.0.0.1:{port}")]));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let eat_pings = handler_fn("eat_pings", |(_, value): NetworkArgs| async move {
            if value.as_raw_line().is_some_and(|line| line.starts_with("PING")) {
                Outcome::Eat
            } else {
                Outcome::Continue
            }
        });
        ctx.events()
            .register(NetworkEventName::RawLine, eat_pings, Priority::PRE_CORE)
            .unwrap();
        let messages = {
            let seen = Arc::clone(&seen);
            handler_fn("messages", move |(_, value): NetworkArgs| {
                let seen = Arc::clone(&seen);
                async move {
                    if let Some(message) = value.as_message() {
                        seen.lock().push(message.command.to_string());
                    }
                }
            })
        };
        ctx.events()
            .register(NetworkEventName::Message, messages, Priority::DEFAULT)
            .unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"PING :x\r\n\r\n:srv NOTICE * :hello\r\n")
                .await
                .unwrap();
        });

        let driver = Connection::new(Arc::clone(&ctx), outbound, CancellationToken::new()).run();
        timeout(Duration::from_secs(5), driver)
            .await
            .unwrap()
            .unwrap();
        server.await.unwrap();

        assert_eq!(*seen.lock(), ["NOTICE"]);
    }

    #[tokio::test]
    async fn test_shutdown_quits() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (ctx, outbound) = context(json!([format!("127.0.0.1:{port}")]));
        let shutdown = CancellationToken::new();

        let driver = tokio::spawn(Connection::new(ctx, outbound, shutdown.clone()).run());
        let (socket, _) = listener.accept().await.unwrap();
        shutdown.cancel();

        let mut lines = BufReader::new(socket).lines();
        let quit = timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quit.as_deref(), Some("QUIT"));
        timeout(Duration::from_secs(5), driver)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_quit_reason_with_line_break_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (ctx, outbound) = context(json!([format!("127.0.0.1:{port}")]));

        let driver = tokio::spawn(
            Connection::new(Arc::clone(&ctx), outbound, CancellationToken::new()).run(),
        );
        let (socket, _) = listener.accept().await.unwrap();
        ctx.request_close(Some("bye\r\nPRIVMSG #tern :injected"))
            .unwrap();

        let mut lines = BufReader::new(socket).lines();
        let quit = timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quit.as_deref(), Some("QUIT"));
        let rest = timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rest, None);
        timeout(Duration::from_secs(5), driver)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_tls_only_network_fails() {
        let (ctx, outbound) = context(json!(["irc.example.org:+6697"]));

        let err = Connection::new(ctx, outbound, CancellationToken::new())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Exhausted { network } if network == "local"));
    }
}
