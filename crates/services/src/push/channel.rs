use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use url::Url;

use super::engine_io::Packet;
use super::envelope::{ClassroomCommand, PushEvent};
use super::{INBOUND_EVENT, OUTBOUND_EVENT};
use crate::config::ApiConfig;
use crate::error::PushError;

const DEFAULT_BUFFER: usize = 64;
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Socket.IO websocket endpoint for an API base URL.
///
/// # Errors
///
/// Returns `PushError::Scheme` for base URLs that are not http(s) or ws(s).
pub fn socket_url(base: &Url) -> Result<Url, PushError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(PushError::Scheme(other.to_string())),
    };
    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| PushError::Scheme(base.scheme().to_string()))?;
    let path = format!("{}/socket.io/", base.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// One logical push connection per dashboard session.
///
/// Owned by the session runtime; dropping it tears the socket down.
pub struct PushChannel {
    events: mpsc::Receiver<PushEvent>,
    commands: Option<mpsc::Sender<ClassroomCommand>>,
    task: Option<JoinHandle<()>>,
}

/// In-process counterpart of a loopback `PushChannel`.
pub struct PushPeer {
    events: mpsc::Sender<PushEvent>,
    commands: mpsc::Receiver<ClassroomCommand>,
}

impl PushChannel {
    /// Opens the websocket and starts the socket task.
    ///
    /// # Errors
    ///
    /// Returns `PushError` if the URL is unusable or the handshake fails.
    pub async fn connect(config: &ApiConfig) -> Result<Self, PushError> {
        let url = socket_url(&config.base_url)?;
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        info!(%url, "push channel connected");

        let (events_tx, events_rx) = mpsc::channel(DEFAULT_BUFFER);
        let (commands_tx, commands_rx) = mpsc::channel(DEFAULT_BUFFER);
        let (write, read) = ws.split();
        let task = tokio::spawn(run_socket(write, read, events_tx, commands_rx));

        Ok(Self {
            events: events_rx,
            commands: Some(commands_tx),
            task: Some(task),
        })
    }

    /// A channel wired to an in-process peer instead of a socket.
    #[must_use]
    pub fn loopback() -> (Self, PushPeer) {
        let (events_tx, events_rx) = mpsc::channel(DEFAULT_BUFFER);
        let (commands_tx, commands_rx) = mpsc::channel(DEFAULT_BUFFER);
        let channel = Self {
            events: events_rx,
            commands: Some(commands_tx),
            task: None,
        };
        let peer = PushPeer {
            events: events_tx,
            commands: commands_rx,
        };
        (channel, peer)
    }

    /// Next inbound event; `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Next inbound event if one is already queued.
    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.events.try_recv().ok()
    }

    /// Queues a command without waiting.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Closed` if the connection is gone or its queue is full.
    pub fn send(&self, command: ClassroomCommand) -> Result<(), PushError> {
        let sender = self.commands.as_ref().ok_or(PushError::Closed)?;
        sender.try_send(command).map_err(|_| PushError::Closed)
    }

    /// Sends a namespace disconnect and waits briefly for the socket task.
    pub async fn disconnect(mut self) {
        self.commands = None;
        self.events.close();
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(DISCONNECT_GRACE, task).await.is_err() {
                abort.abort();
            }
        }
        info!("push channel disconnected");
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl PushPeer {
    /// Delivers an event to the channel.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Closed` once the channel has been dropped.
    pub async fn notify(&self, event: PushEvent) -> Result<(), PushError> {
        self.events.send(event).await.map_err(|_| PushError::Closed)
    }

    /// Next command sent by the channel, if one is already queued.
    pub fn try_next_command(&mut self) -> Option<ClassroomCommand> {
        self.commands.try_recv().ok()
    }

    pub async fn next_command(&mut self) -> Option<ClassroomCommand> {
        self.commands.recv().await
    }
}

//
// ─── SOCKET TASK ──────────────────────────────────────────────────────────────
//

async fn send_packet<S>(sink: &mut S, packet: &Packet) -> bool
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match sink.send(Message::text(packet.encode())).await {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "push send failed");
            false
        }
    }
}

async fn run_socket<W, R>(
    mut write: W,
    mut read: R,
    events: mpsc::Sender<PushEvent>,
    mut commands: mpsc::Receiver<ClassroomCommand>,
) where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: futures_util::Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "push socket closed by server");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        warn!(%err, "push socket failed");
                        break;
                    }
                    None => break,
                };

                match Packet::decode(text.as_str()) {
                    Ok(Packet::Open(handshake)) => {
                        debug!(sid = %handshake.sid, "engine.io open");
                        if !send_packet(&mut write, &Packet::Connect).await {
                            break;
                        }
                    }
                    Ok(Packet::Ping) => {
                        if !send_packet(&mut write, &Packet::Pong).await {
                            break;
                        }
                    }
                    Ok(Packet::Connect) => info!("push namespace joined"),
                    Ok(Packet::Event { name, args }) if name == INBOUND_EVENT => {
                        for arg in &args {
                            let event = PushEvent::from_value(arg);
                            debug!(?event, "push event");
                            if events.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Packet::Event { name, .. }) => debug!(%name, "ignoring push event"),
                    Ok(Packet::Disconnect | Packet::Close) => {
                        info!("push namespace closed by server");
                        break;
                    }
                    Ok(Packet::ConnectError(message)) => {
                        warn!(%message, "push namespace rejected");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => warn!(%err, "dropping push frame"),
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    let _ = send_packet(&mut write, &Packet::Disconnect).await;
                    break;
                };
                let packet = Packet::event(OUTBOUND_EVENT, command.encode());
                if !send_packet(&mut write, &packet).await {
                    break;
                }
                debug!(?command, "push command sent");
            }
        }
    }
    let _ = write.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use classroom_core::model::LessonId;

    #[test]
    fn socket_url_switches_scheme_and_path() {
        let base = Url::parse("https://school.example.com/backend/").unwrap();
        assert_eq!(
            socket_url(&base).unwrap().as_str(),
            "wss://school.example.com/backend/socket.io/?EIO=4&transport=websocket"
        );

        let local = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            socket_url(&local).unwrap().as_str(),
            "ws://localhost:8000/socket.io/?EIO=4&transport=websocket"
        );

        let ftp = Url::parse("ftp://example.com").unwrap();
        assert!(matches!(socket_url(&ftp), Err(PushError::Scheme(_))));
    }

    #[tokio::test]
    async fn loopback_carries_events_and_commands() {
        let (mut channel, mut peer) = PushChannel::loopback();

        peer.notify(PushEvent::decode("student_answered,3"))
            .await
            .unwrap();
        assert!(
            channel
                .recv()
                .await
                .unwrap()
                .triggers_refresh_for(LessonId::new(3))
        );

        channel.send(ClassroomCommand::ExerciseEnd).unwrap();
        assert_eq!(peer.try_next_command(), Some(ClassroomCommand::ExerciseEnd));
    }

    #[tokio::test]
    async fn try_recv_only_returns_queued_events() {
        let (mut channel, peer) = PushChannel::loopback();
        assert_eq!(channel.try_recv(), None);

        peer.notify(PushEvent::Other("a".into())).await.unwrap();
        peer.notify(PushEvent::Other("b".into())).await.unwrap();
        assert_eq!(channel.try_recv(), Some(PushEvent::Other("a".into())));
        assert_eq!(channel.try_recv(), Some(PushEvent::Other("b".into())));
        assert_eq!(channel.try_recv(), None);
    }

    #[tokio::test]
    async fn dropping_the_channel_closes_the_peer() {
        let (channel, peer) = PushChannel::loopback();
        drop(channel);
        assert!(peer.notify(PushEvent::Other("late".into())).await.is_err());
    }
}
