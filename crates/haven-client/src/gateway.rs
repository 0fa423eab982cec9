use std::collections::HashSet;
use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use haven_types::{ChannelId, GatewayCommand, GatewayEvent};

use crate::error::{ClientError, Result};

/// Source of live events for channel sessions.
///
/// `next_event` yields `None` once the underlying connection is gone; the
/// caller keeps whatever state it has and may resume with a reconnected
/// source.
pub trait PushSource: Send {
    fn join(&mut self, channel_id: &ChannelId) -> Result<()>;

    fn leave(&mut self, channel_id: &ChannelId) -> Result<()>;

    fn next_event(&mut self) -> impl Future<Output = Option<GatewayEvent>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connected,
    Closed,
}

/// Client end of a gateway connection.
///
/// Constructed explicitly and owned by whoever opens channel views; nothing
/// about the connection is global. The transport drives the other end, the
/// [`GatewayLink`].
pub struct GatewayHandle {
    commands: mpsc::UnboundedSender<GatewayCommand>,
    events: mpsc::UnboundedReceiver<GatewayEvent>,
    /// Channel-scoped events for channels not in here are dropped.
    joined: HashSet<ChannelId>,
    state: ConnectionState,
}

/// Transport end of a gateway connection: forward server events into
/// `events` and send whatever arrives on `commands` to the server.
pub struct GatewayLink {
    pub commands: mpsc::UnboundedReceiver<GatewayCommand>,
    pub events: mpsc::UnboundedSender<GatewayEvent>,
}

impl GatewayHandle {
    pub fn pair() -> (GatewayHandle, GatewayLink) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = GatewayHandle {
            commands: cmd_tx,
            events: event_rx,
            joined: HashSet::new(),
            state: ConnectionState::Idle,
        };
        let link = GatewayLink {
            commands: cmd_rx,
            events: event_tx,
        };
        (handle, link)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn joined(&self) -> impl Iterator<Item = &ChannelId> {
        self.joined.iter()
    }

    /// Authenticate the connection.
    pub fn connect(&mut self, token: &str) -> Result<()> {
        self.send(GatewayCommand::Identify {
            token: token.to_string(),
        })?;
        self.state = ConnectionState::Connected;
        info!("gateway identify sent");
        Ok(())
    }

    fn send(&mut self, command: GatewayCommand) -> Result<()> {
        if self.commands.send(command).is_err() {
            self.state = ConnectionState::Closed;
            return Err(ClientError::GatewayClosed);
        }
        Ok(())
    }
}

impl PushSource for GatewayHandle {
    fn join(&mut self, channel_id: &ChannelId) -> Result<()> {
        self.send(GatewayCommand::JoinChannel {
            channel_id: channel_id.clone(),
        })?;
        self.joined.insert(channel_id.clone());
        debug!(channel = %channel_id, "joined channel");
        Ok(())
    }

    fn leave(&mut self, channel_id: &ChannelId) -> Result<()> {
        // Stop delivering right away even if the leave cannot be sent.
        self.joined.remove(channel_id);
        self.send(GatewayCommand::LeaveChannel {
            channel_id: channel_id.clone(),
        })?;
        debug!(channel = %channel_id, "left channel");
        Ok(())
    }

    async fn next_event(&mut self) -> Option<GatewayEvent> {
        loop {
            let Some(event) = self.events.recv().await else {
                if self.state != ConnectionState::Closed {
                    warn!("gateway event stream ended");
                }
                self.state = ConnectionState::Closed;
                return None;
            };
            if let Some(channel_id) = event.channel_id() {
                if !self.joined.contains(channel_id) {
                    continue;
                }
            }
            return Some(event);
        }
    }
}
