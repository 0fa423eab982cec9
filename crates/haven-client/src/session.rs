use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use haven_threads::{LiveMerger, MergeStats, ThreadStore};
use haven_types::{ChannelId, GatewayEvent, MessageId, ReactionGroup, ToggleOutcome, UserId};

use crate::api::ChatApi;
use crate::error::{ClientError, Result};
use crate::gateway::PushSource;
use crate::membership::{MemberList, Permissions};

struct SessionState {
    store: ThreadStore,
    merger: LiveMerger,
}

type SharedState = Arc<Mutex<Option<SessionState>>>;

fn lock(state: &SharedState) -> MutexGuard<'_, Option<SessionState>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One open channel view: owns the channel's thread store and wires the
/// REST and push collaborators into it.
///
/// The store lock is only ever taken between awaits. Once [`close`] has run
/// (or the session is dropped) the store is gone, the live task leaves the
/// channel, and any request still in flight resolves to
/// [`ClientError::SessionClosed`] without applying anything.
///
/// [`close`]: ChannelSession::close
pub struct ChannelSession<A> {
    api: Arc<A>,
    channel_id: ChannelId,
    permissions: Permissions,
    state: SharedState,
    cancel: CancellationToken,
}

impl<A: ChatApi> ChannelSession<A> {
    pub fn open(api: Arc<A>, channel_id: ChannelId, permissions: Permissions) -> Self {
        info!(channel = %channel_id, viewer = %permissions.viewer, role = ?permissions.role, "channel session opened");
        let state = SessionState {
            store: ThreadStore::new(channel_id.clone()),
            merger: LiveMerger::new(),
        };
        Self {
            api,
            channel_id,
            permissions,
            state: Arc::new(Mutex::new(Some(state))),
            cancel: CancellationToken::new(),
        }
    }

    /// Open after resolving the viewer's role from the channel's member list.
    pub async fn open_for(api: Arc<A>, channel_id: ChannelId, viewer: &UserId) -> Result<Self> {
        let members = MemberList::new(api.fetch_members(&channel_id).await?);
        let permissions = Permissions::resolve(&members, &channel_id, viewer);
        Ok(Self::open(api, channel_id, permissions))
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).is_some()
    }

    /// Run `f` against the current store.
    pub fn read<R>(&self, f: impl FnOnce(&ThreadStore) -> R) -> Result<R> {
        self.with_state(|state| f(&state.store))
    }

    pub fn reaction_groups(&self, message_id: &MessageId) -> Result<Vec<ReactionGroup>> {
        let viewer = &self.permissions.viewer;
        self.with_state(|state| {
            state
                .store
                .get(message_id)
                .map(|node| node.message().reactions.groups(Some(viewer)))
        })?
        .ok_or_else(|| ClientError::UnknownMessage(message_id.clone()))
    }

    pub fn merge_stats(&self) -> Result<MergeStats> {
        self.with_state(|state| state.merger.stats())
    }

    /// Fetch the channel and fold it into the store.
    ///
    /// Messages that arrived live before the fetch resolved are kept. Calling
    /// this again after a gateway reconnect is the re-sync path.
    pub async fn load(&self) -> Result<usize> {
        self.ensure_open()?;
        let batch = self.api.fetch_messages(&self.channel_id).await.inspect_err(|e| {
            warn!(channel = %self.channel_id, error = %e, "fetch failed");
        })?;
        let total = self.with_state(|state| state.store.reconcile(batch)).inspect_err(|_| {
            debug!(channel = %self.channel_id, "dropping batch fetched after close");
        })?;
        info!(channel = %self.channel_id, total, "channel loaded");
        Ok(total)
    }

    /// Post a message (or a reply when `parent` is set) and merge the
    /// server's copy. The gateway echo of the same message is absorbed as a
    /// duplicate whichever arrives first.
    pub async fn send(&self, content: &str, parent: Option<&MessageId>) -> Result<MessageId> {
        if !self.permissions.can_post() {
            return Err(self.forbidden("send"));
        }
        self.ensure_open()?;

        let message = self
            .api
            .send_message(&self.channel_id, content, parent)
            .await
            .inspect_err(|e| warn!(channel = %self.channel_id, error = %e, "send failed"))?;
        let id = message.id.clone();

        let outcome = self
            .with_state(|state| state.store.merge_insert(message))
            .inspect_err(|_| debug!(message_id = %id, "dropping sent message after close"))?;
        debug!(message_id = %id, outcome = ?outcome, "sent message merged");
        Ok(id)
    }

    /// Flip the viewer's `emoji` on a message.
    ///
    /// The direction is decided from the current ledger, sent through the
    /// idempotent add/remove calls, and applied only after the server accepts
    /// it. A push event for the same change may land first; both paths
    /// converge.
    pub async fn toggle_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<ToggleOutcome> {
        if !self.permissions.can_react() {
            return Err(self.forbidden("react"));
        }
        let viewer = self.permissions.viewer.clone();
        let acted = self
            .with_state(|state| {
                state
                    .store
                    .get(message_id)
                    .map(|node| node.message().reactions.contains(emoji, &viewer))
            })?
            .ok_or_else(|| ClientError::UnknownMessage(message_id.clone()))?;

        let outcome = if acted {
            self.api.remove_reaction(message_id, emoji).await?;
            ToggleOutcome::Removed
        } else {
            self.api.add_reaction(message_id, emoji).await?;
            ToggleOutcome::Added
        };

        self.with_state(|state| match outcome {
            ToggleOutcome::Added => state.store.add_reaction(message_id, emoji, &viewer),
            ToggleOutcome::Removed => state.store.remove_reaction(message_id, emoji, &viewer),
        })?;
        debug!(message_id = %message_id, emoji, outcome = ?outcome, "reaction toggled");
        Ok(outcome)
    }

    /// Join the channel on `source` and merge its events until the session
    /// closes or the source disconnects. The task hands the source back so a
    /// caller can reconnect it and follow again; the store keeps its state
    /// in between.
    pub fn follow<P>(&self, mut source: P) -> JoinHandle<P>
    where
        P: PushSource + 'static,
    {
        let state = self.state.clone();
        let channel_id = self.channel_id.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            if let Err(e) = source.join(&channel_id) {
                warn!(channel = %channel_id, error = %e, "could not join channel");
                return source;
            }
            info!(channel = %channel_id, "following live events");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        if let Err(e) = source.leave(&channel_id) {
                            debug!(channel = %channel_id, error = %e, "leave not delivered");
                        }
                        break;
                    }
                    event = source.next_event() => {
                        let Some(event) = event else {
                            warn!(channel = %channel_id, "push source disconnected, keeping last known state");
                            break;
                        };
                        if !merge_event(&state, event) {
                            break;
                        }
                    }
                }
            }
            source
        })
    }

    /// Tear the view down: stop the live task and discard the store.
    pub fn close(&self) {
        self.cancel.cancel();
        if lock(&self.state).take().is_some() {
            info!(channel = %self.channel_id, "channel session closed");
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Result<R> {
        lock(&self.state).as_mut().map(f).ok_or(ClientError::SessionClosed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ClientError::SessionClosed)
        }
    }

    fn forbidden(&self, action: &'static str) -> ClientError {
        ClientError::Forbidden {
            channel_id: self.channel_id.clone(),
            action,
        }
    }
}

impl<A> Drop for ChannelSession<A> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Apply one event. Returns false once the session is gone.
fn merge_event(state: &SharedState, event: GatewayEvent) -> bool {
    let mut guard = lock(state);
    match guard.as_mut() {
        Some(session) => {
            session.merger.apply(&mut session.store, event);
            true
        }
        None => false,
    }
}
