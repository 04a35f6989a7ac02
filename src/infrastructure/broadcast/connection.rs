use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::codec::{BroadcastFrame, FrameParser};
use super::constants::{CONNECTION_TIMEOUT, HANDSHAKE_TIMEOUT, is_private_channel};
use super::error::PusherErrorCode;
use super::heartbeat::{Keepalive, KeepaliveAction};
use super::payloads::OutboundFrame;
use super::state::{ChannelRegistry, ChannelStatus, ConnectionState};
use crate::domain::errors::{BroadcastError, BroadcastResult};
use crate::domain::ports::{BroadcastEvent, ChannelAuthPort};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Channel membership changes requested while the connection runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastCommand {
    Join(String),
    Leave(String),
}

#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    async fn connect(&mut self, url: &str) -> BroadcastResult<()>;
    async fn disconnect(&mut self);
    async fn send(&mut self, frame: &OutboundFrame) -> BroadcastResult<()>;
    async fn receive(&mut self) -> BroadcastResult<BroadcastFrame>;
    fn is_connected(&self) -> bool;
}

pub struct WebSocketTransport {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    connected: bool,
}

impl WebSocketTransport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            connected: false,
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastTransport for WebSocketTransport {
    async fn connect(&mut self, url: &str) -> BroadcastResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| BroadcastError::timeout("connection"))?
            .map_err(|e| BroadcastError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        debug!("WebSocket connection closed");
    }

    async fn send(&mut self, frame: &OutboundFrame) -> BroadcastResult<()> {
        let writer = self.writer.as_mut().ok_or(BroadcastError::NotConnected)?;

        let json =
            serde_json::to_string(frame).map_err(|e| BroadcastError::serialization(e.to_string()))?;
        trace!(event = %frame.event, channel = frame.channel().unwrap_or("-"), "Sending frame");

        writer
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| BroadcastError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> BroadcastResult<BroadcastFrame> {
        let reader = self.reader.as_mut().ok_or(BroadcastError::NotConnected)?;

        loop {
            let text = match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => text.to_string(),
                Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Ignoring non UTF-8 binary frame");
                        continue;
                    }
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );
                    return Err(BroadcastError::ConnectionClosed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                    continue;
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => continue,
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(BroadcastError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(BroadcastError::ConnectionClosed {
                        code: 1006,
                        reason: "Stream ended".to_string(),
                    });
                }
            };

            match FrameParser::parse(&text) {
                Ok(frame) => return Ok(frame),
                Err(e) => warn!(error = %e, "Dropping undecodable frame"),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Drives one socket session: handshake, subscriptions, keepalive and
/// event forwarding.
pub struct ConnectionHandler {
    transport: Box<dyn BroadcastTransport>,
    state: ConnectionState,
    socket_id: Option<String>,
    keepalive: Keepalive,
    authorizer: Option<Arc<dyn ChannelAuthPort>>,
    event_tx: mpsc::UnboundedSender<BroadcastEvent>,
}

impl ConnectionHandler {
    pub fn new(
        transport: Box<dyn BroadcastTransport>,
        authorizer: Option<Arc<dyn ChannelAuthPort>>,
        event_tx: mpsc::UnboundedSender<BroadcastEvent>,
    ) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            socket_id: None,
            keepalive: Keepalive::new(Instant::now()),
            authorizer,
            event_tx,
        }
    }

    /// Opens the socket and waits for the server's handshake.
    pub async fn connect(&mut self, url: &str) -> BroadcastResult<()> {
        self.state = ConnectionState::Connecting;
        self.transport.connect(url).await?;

        self.state = ConnectionState::AwaitingHandshake;
        let (socket_id, activity_timeout) = timeout(HANDSHAKE_TIMEOUT, self.await_handshake())
            .await
            .map_err(|_| BroadcastError::timeout("connection handshake"))??;

        self.keepalive = Keepalive::new(Instant::now());
        if let Some(activity_timeout) = activity_timeout {
            self.keepalive.set_activity_timeout(activity_timeout);
        }

        info!(
            socket_id = %socket_id,
            activity_timeout_s = self.keepalive.activity_timeout().as_secs(),
            "Broadcast connection established"
        );
        self.state = ConnectionState::Connected;
        self.socket_id = Some(socket_id.clone());
        let _ = self.event_tx.send(BroadcastEvent::Connected { socket_id });
        Ok(())
    }

    async fn await_handshake(
        &mut self,
    ) -> BroadcastResult<(String, Option<std::time::Duration>)> {
        loop {
            match self.transport.receive().await? {
                BroadcastFrame::ConnectionEstablished {
                    socket_id,
                    activity_timeout,
                } => return Ok((socket_id, activity_timeout)),
                BroadcastFrame::Error {
                    code: Some(code),
                    message,
                } => {
                    return Err(BroadcastError::ConnectionClosed {
                        code,
                        reason: message,
                    });
                }
                other => trace!(frame = ?other, "Frame before handshake ignored"),
            }
        }
    }

    /// Runs until the command channel closes or the connection fails.
    ///
    /// Every channel in `channels` is (re)subscribed on entry.
    pub async fn run(
        &mut self,
        channels: &mut ChannelRegistry,
        commands: &mut mpsc::UnboundedReceiver<BroadcastCommand>,
    ) -> BroadcastResult<()> {
        if !self.state.is_connected() {
            return Err(BroadcastError::NotConnected);
        }
        channels.reset();
        if !channels.is_empty() {
            debug!(channels = channels.len(), "Restoring channel subscriptions");
        }
        for channel in channels.pending() {
            self.subscribe(&channel, channels).await?;
        }

        while self.state.is_active() {
            let deadline = self.keepalive.deadline();

            tokio::select! {
                frame = self.transport.receive() => {
                    self.keepalive.record_activity(Instant::now());
                    self.handle_frame(frame?, channels).await?;
                }

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, channels).await?,
                    None => {
                        self.shutdown().await;
                        return Ok(());
                    }
                },

                () = sleep_until(deadline) => self.check_keepalive().await?,
            }
        }

        Ok(())
    }

    async fn check_keepalive(&mut self) -> BroadcastResult<()> {
        let now = Instant::now();
        match self.keepalive.poll(now) {
            KeepaliveAction::Wait => Ok(()),
            KeepaliveAction::SendPing => {
                trace!("Sending keepalive ping");
                self.transport.send(&OutboundFrame::ping()).await?;
                self.keepalive.record_ping_sent(now);
                Ok(())
            }
            KeepaliveAction::Expired => {
                warn!("Keepalive pong not received");
                Err(BroadcastError::ConnectionClosed {
                    code: PusherErrorCode::PongNotReceived.into(),
                    reason: "pong not received".to_string(),
                })
            }
        }
    }

    async fn handle_frame(
        &mut self,
        frame: BroadcastFrame,
        channels: &mut ChannelRegistry,
    ) -> BroadcastResult<()> {
        match frame {
            BroadcastFrame::Event(event) => {
                if channels.status(&event.channel).is_some() {
                    debug!(channel = %event.channel, event = %event.event, "Push event received");
                    let _ = self.event_tx.send(BroadcastEvent::Push(event));
                } else {
                    debug!(channel = %event.channel, "Event for unknown channel dropped");
                }
            }
            BroadcastFrame::Ping => self.transport.send(&OutboundFrame::pong()).await?,
            BroadcastFrame::SubscriptionSucceeded { channel } => {
                debug!(channel = %channel, "Subscription confirmed");
                channels.set_status(&channel, ChannelStatus::Subscribed);
                let _ = self.event_tx.send(BroadcastEvent::Subscribed { channel });
            }
            BroadcastFrame::SubscriptionError {
                channel,
                status,
                message,
            } => {
                warn!(channel = %channel, status = ?status, error = %message, "Subscription refused");
                channels.set_status(&channel, ChannelStatus::Failed);
                let _ = self.event_tx.send(BroadcastEvent::Error {
                    message: format!("subscription to {channel} refused: {message}"),
                    recoverable: false,
                });
            }
            BroadcastFrame::Error {
                code: Some(code),
                message,
            } if (4000..4300).contains(&code) => {
                warn!(code, kind = ?PusherErrorCode::from_u16(code), error = %message, "Server ended the session");
                return Err(BroadcastError::ConnectionClosed {
                    code,
                    reason: message,
                });
            }
            BroadcastFrame::Error { code, message } => {
                warn!(code = ?code, error = %message, "Server reported an error");
                let _ = self.event_tx.send(BroadcastEvent::Error {
                    message,
                    recoverable: true,
                });
            }
            BroadcastFrame::Pong => trace!("Keepalive pong"),
            BroadcastFrame::ConnectionEstablished { .. } | BroadcastFrame::Ignored { .. } => {
                trace!(frame = ?frame, "Frame ignored");
            }
        }
        Ok(())
    }

    async fn handle_command(
        &mut self,
        command: BroadcastCommand,
        channels: &mut ChannelRegistry,
    ) -> BroadcastResult<()> {
        match command {
            BroadcastCommand::Join(channel) => {
                if channels.insert(&channel) {
                    self.subscribe(&channel, channels).await?;
                }
            }
            BroadcastCommand::Leave(channel) => {
                if channels.remove(&channel) {
                    debug!(channel = %channel, "Unsubscribing");
                    self.transport
                        .send(&OutboundFrame::unsubscribe(&channel))
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn subscribe(
        &mut self,
        channel: &str,
        channels: &mut ChannelRegistry,
    ) -> BroadcastResult<()> {
        let auth = if is_private_channel(channel) {
            match self.authorize(channel).await {
                Ok(auth) => Some(auth),
                Err(e) => {
                    warn!(channel = channel, error = %e, "Channel authorisation failed");
                    channels.set_status(channel, ChannelStatus::Failed);
                    let _ = self.event_tx.send(BroadcastEvent::Error {
                        message: e.to_string(),
                        recoverable: false,
                    });
                    return Ok(());
                }
            }
        } else {
            None
        };

        debug!(channel = channel, "Subscribing");
        self.transport
            .send(&OutboundFrame::subscribe(channel, auth.as_deref()))
            .await?;
        channels.set_status(channel, ChannelStatus::Requested);
        Ok(())
    }

    async fn authorize(&self, channel: &str) -> BroadcastResult<String> {
        let socket_id = self.socket_id.clone().ok_or(BroadcastError::NotConnected)?;
        let authorizer = self
            .authorizer
            .clone()
            .ok_or_else(|| BroadcastError::authorization(channel, "no authorizer configured"))?;

        authorizer
            .authorize_channel(&socket_id, channel)
            .await
            .map_err(|e| BroadcastError::authorization(channel, e.to_string()))
    }

    async fn shutdown(&mut self) {
        self.state = ConnectionState::ShuttingDown;
        if self.transport.is_connected() {
            self.transport.disconnect().await;
        }
        self.state = ConnectionState::Disconnected;
        debug!("Broadcast session shut down");
    }

    #[must_use]
    pub fn socket_id(&self) -> Option<&str> {
        self.socket_id.as_deref()
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{ScriptedTransport, StaticAuthorizer, established};
    use super::*;
    use crate::domain::ports::PushEvent;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for_sent(sent: &Arc<Mutex<Vec<OutboundFrame>>>, count: usize) {
        for _ in 0..200 {
            if sent.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} frames, got {:?}", sent.lock());
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<BroadcastEvent>) -> BroadcastEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[test]
    fn test_websocket_transport_initial_state() {
        let transport = WebSocketTransport::new();
        assert!(!transport.is_connected());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_private_subscribe_future_is_send() {
        let (transport, _frames) = ScriptedTransport::new();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let authorizer = Arc::new(StaticAuthorizer { refuse: false });
        let mut handler = ConnectionHandler::new(Box::new(transport), Some(authorizer), event_tx);
        let mut channels = ChannelRegistry::new();
        channels.insert("private-user.7");
        let (_command_tx, mut commands) = mpsc::unbounded_channel();

        assert_send(&handler.run(&mut channels, &mut commands));
    }

    #[tokio::test]
    async fn test_handshake_reports_socket_id() {
        let (transport, frames) = ScriptedTransport::new();
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let mut handler = ConnectionHandler::new(Box::new(transport), None, event_tx);

        frames.send(Ok(BroadcastFrame::Pong)).unwrap();
        frames.send(established("12.34")).unwrap();
        handler.connect("wss://ws.test/app/key").await.unwrap();

        assert_eq!(handler.socket_id(), Some("12.34"));
        assert!(handler.state().is_connected());
        assert!(matches!(
            next_event(&mut events).await,
            BroadcastEvent::Connected { socket_id } if socket_id == "12.34"
        ));
    }

    #[tokio::test]
    async fn test_handshake_error_code_fails_connect() {
        let (transport, frames) = ScriptedTransport::new();
        let (event_tx, _events) = mpsc::unbounded_channel();
        let mut handler = ConnectionHandler::new(Box::new(transport), None, event_tx);

        frames
            .send(Ok(BroadcastFrame::Error {
                code: Some(4001),
                message: "Application does not exist".to_string(),
            }))
            .unwrap();

        let err = handler.connect("wss://ws.test").await.unwrap_err();
        assert_eq!(err.close_code(), Some(4001));
    }

    #[tokio::test]
    async fn test_session_flow() {
        let (transport, frames) = ScriptedTransport::new();
        let sent = transport.sent.clone();
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let authorizer = Arc::new(StaticAuthorizer { refuse: false });
        let mut handler = ConnectionHandler::new(Box::new(transport), Some(authorizer), event_tx);

        frames.send(established("1.2")).unwrap();
        handler.connect("wss://ws.test").await.unwrap();
        next_event(&mut events).await;

        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(async move {
            let mut channels = ChannelRegistry::new();
            handler.run(&mut channels, &mut command_rx).await
        });

        command_tx
            .send(BroadcastCommand::Join("private-bookings.1".to_string()))
            .unwrap();
        wait_for_sent(&sent, 1).await;
        assert_eq!(
            sent.lock()[0],
            OutboundFrame::subscribe("private-bookings.1", Some("sig:1.2:private-bookings.1"))
        );

        frames
            .send(Ok(BroadcastFrame::SubscriptionSucceeded {
                channel: "private-bookings.1".to_string(),
            }))
            .unwrap();
        assert!(matches!(
            next_event(&mut events).await,
            BroadcastEvent::Subscribed { channel } if channel == "private-bookings.1"
        ));

        frames
            .send(Ok(BroadcastFrame::Event(PushEvent::new("other", "X", json!({})))))
            .unwrap();
        frames
            .send(Ok(BroadcastFrame::Event(PushEvent::new(
                "private-bookings.1",
                "BookingCreated",
                json!({"id": 1}),
            ))))
            .unwrap();
        let BroadcastEvent::Push(event) = next_event(&mut events).await else {
            panic!("expected push event");
        };
        assert_eq!(event.channel, "private-bookings.1");

        frames.send(Ok(BroadcastFrame::Ping)).unwrap();
        wait_for_sent(&sent, 2).await;
        assert_eq!(sent.lock()[1], OutboundFrame::pong());

        command_tx
            .send(BroadcastCommand::Leave("private-bookings.1".to_string()))
            .unwrap();
        wait_for_sent(&sent, 3).await;
        assert_eq!(sent.lock()[2], OutboundFrame::unsubscribe("private-bookings.1"));

        drop(command_tx);
        assert!(session.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_refused_authorisation_keeps_connection() {
        let (transport, frames) = ScriptedTransport::new();
        let sent = transport.sent.clone();
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let authorizer = Arc::new(StaticAuthorizer { refuse: true });
        let mut handler = ConnectionHandler::new(Box::new(transport), Some(authorizer), event_tx);

        frames.send(established("1.2")).unwrap();
        handler.connect("wss://ws.test").await.unwrap();
        next_event(&mut events).await;

        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(async move {
            let mut channels = ChannelRegistry::new();
            handler.run(&mut channels, &mut command_rx).await
        });

        command_tx
            .send(BroadcastCommand::Join("private-admin.notifications".to_string()))
            .unwrap();
        assert!(matches!(
            next_event(&mut events).await,
            BroadcastEvent::Error { recoverable: false, .. }
        ));

        command_tx
            .send(BroadcastCommand::Join("public-news".to_string()))
            .unwrap();
        wait_for_sent(&sent, 1).await;
        assert_eq!(sent.lock()[0], OutboundFrame::subscribe("public-news", None));

        drop(command_tx);
        assert!(session.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_protocol_error_code_ends_session() {
        let (transport, frames) = ScriptedTransport::new();
        let (event_tx, _events) = mpsc::unbounded_channel();
        let mut handler = ConnectionHandler::new(Box::new(transport), None, event_tx);

        frames.send(established("1.2")).unwrap();
        handler.connect("wss://ws.test").await.unwrap();

        frames
            .send(Ok(BroadcastFrame::Error {
                code: Some(4201),
                message: "Pong reply not received".to_string(),
            }))
            .unwrap();

        let (_command_tx, mut command_rx) = mpsc::unbounded_channel();
        let mut channels = ChannelRegistry::new();
        let err = handler.run(&mut channels, &mut command_rx).await.unwrap_err();
        assert_eq!(err.close_code(), Some(4201));
    }

    #[tokio::test]
    async fn test_run_requires_handshake() {
        let (transport, _frames) = ScriptedTransport::new();
        let sent = transport.sent.clone();
        let (event_tx, _events) = mpsc::unbounded_channel();
        let mut handler = ConnectionHandler::new(Box::new(transport), None, event_tx);

        let mut channels = ChannelRegistry::new();
        channels.insert("news");
        let (_command_tx, mut command_rx) = mpsc::unbounded_channel::<BroadcastCommand>();
        let err = handler.run(&mut channels, &mut command_rx).await.unwrap_err();

        assert!(matches!(err, BroadcastError::NotConnected));
        assert!(sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_channels_resubscribed_on_entry() {
        let (transport, frames) = ScriptedTransport::new();
        let sent = transport.sent.clone();
        let (event_tx, _events) = mpsc::unbounded_channel();
        let mut handler = ConnectionHandler::new(Box::new(transport), None, event_tx);

        frames.send(established("1.2")).unwrap();
        handler.connect("wss://ws.test").await.unwrap();

        let mut channels = ChannelRegistry::new();
        channels.insert("news");
        channels.set_status("news", ChannelStatus::Subscribed);

        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<BroadcastCommand>();
        drop(command_tx);
        handler.run(&mut channels, &mut command_rx).await.unwrap();

        assert_eq!(sent.lock().as_slice(), [OutboundFrame::subscribe("news", None)]);
    }
}
