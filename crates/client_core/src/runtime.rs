//! The single event loop that owns a [`DeliberationStore`].
//!
//! Listener callbacks and UI code never touch the store directly. They send
//! commands through a [`StoreHandle`]; the loop applies them one at a time and
//! publishes the resulting store on a `watch` channel, so readers only ever
//! see whole mutations.

use serde_json::Value;
use shared::{
    domain::StatementId,
    protocol::{LobbyRoom, MembershipSubscription, RoomJoinRequest, StoreEvent},
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::StoreError,
    store::{DeliberationStore, SessionContext},
    subscription::{EntityFeed, Unsubscribe},
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store runtime is not running")]
    Stopped,
}

enum StoreCommand {
    Apply(StoreEvent),
    ApplyRaw(Value),
    SetSession(SessionContext),
    WithdrawActiveRequest,
    Shutdown,
}

impl StoreCommand {
    fn name(&self) -> &'static str {
        match self {
            StoreCommand::Apply(event) => event.kind(),
            StoreCommand::ApplyRaw(_) => "apply_raw",
            StoreCommand::SetSession(_) => "set_session",
            StoreCommand::WithdrawActiveRequest => "withdraw_active_request",
            StoreCommand::Shutdown => "shutdown",
        }
    }
}

struct Envelope {
    command: StoreCommand,
    reply: Option<oneshot::Sender<Result<(), StoreError>>>,
}

/// Cloneable sender side of the store loop.
#[derive(Clone)]
pub struct StoreHandle {
    commands: mpsc::UnboundedSender<Envelope>,
}

impl StoreHandle {
    fn send(&self, command: StoreCommand) {
        let name = command.name();
        if self
            .commands
            .send(Envelope {
                command,
                reply: None,
            })
            .is_err()
        {
            warn!(command = name, "store runtime stopped; command dropped");
        }
    }

    async fn request(&self, command: StoreCommand) -> Result<(), DispatchError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope {
                command,
                reply: Some(reply),
            })
            .map_err(|_| DispatchError::Stopped)?;
        response.await.map_err(|_| DispatchError::Stopped)??;
        Ok(())
    }

    /// Queues an event without waiting; failures go to the reporter only.
    pub fn dispatch(&self, event: StoreEvent) {
        self.send(StoreCommand::Apply(event));
    }

    pub fn dispatch_raw(&self, raw: Value) {
        self.send(StoreCommand::ApplyRaw(raw));
    }

    pub fn set_session(&self, session: SessionContext) {
        self.send(StoreCommand::SetSession(session));
    }

    pub async fn apply(&self, event: StoreEvent) -> Result<(), DispatchError> {
        self.request(StoreCommand::Apply(event)).await
    }

    pub async fn apply_raw(&self, raw: Value) -> Result<(), DispatchError> {
        self.request(StoreCommand::ApplyRaw(raw)).await
    }

    pub async fn withdraw_active_request(&self) -> Result<(), DispatchError> {
        self.request(StoreCommand::WithdrawActiveRequest).await
    }

    /// Mirrors every join request under a parent into the store.
    pub fn listen_to_room_requests(&self, feed: &dyn EntityFeed<RoomJoinRequest>) -> Unsubscribe {
        let on_add = self.clone();
        let on_remove = self.clone();
        feed.subscribe(
            Box::new(move |request: RoomJoinRequest| {
                let parent_id = request.parent_id.clone();
                on_add.dispatch(StoreEvent::AskToJoinRoom {
                    request: Some(request),
                    parent_id,
                });
            }),
            Box::new(move |request: RoomJoinRequest| {
                on_remove.dispatch(StoreEvent::RoomRequestRemoved {
                    request_id: request.request_id,
                });
            }),
        )
    }

    /// Follows the signed-in user's own request. Its removal withdraws every
    /// request under `parent_id`.
    pub fn listen_to_user_request(
        &self,
        feed: &dyn EntityFeed<RoomJoinRequest>,
        parent_id: StatementId,
    ) -> Unsubscribe {
        let on_add = self.clone();
        let on_remove = self.clone();
        let add_parent = parent_id.clone();
        feed.subscribe(
            Box::new(move |request: RoomJoinRequest| {
                on_add.dispatch(StoreEvent::AskToJoinRoom {
                    request: Some(request),
                    parent_id: add_parent.clone(),
                });
            }),
            Box::new(move |_request: RoomJoinRequest| {
                on_remove.dispatch(StoreEvent::AskToJoinRoom {
                    request: None,
                    parent_id: parent_id.clone(),
                });
            }),
        )
    }

    pub fn listen_to_lobby_rooms(&self, feed: &dyn EntityFeed<LobbyRoom>) -> Unsubscribe {
        let on_add = self.clone();
        feed.subscribe(
            Box::new(move |room: LobbyRoom| {
                on_add.dispatch(StoreEvent::LobbyRoomUpdated { room });
            }),
            Box::new(|room: LobbyRoom| {
                debug!(
                    statement_id = %room.statement_id,
                    room_id = %room.room_id,
                    "lobby rooms only change by replace; removal ignored"
                );
            }),
        )
    }

    pub fn listen_to_members(&self, feed: &dyn EntityFeed<MembershipSubscription>) -> Unsubscribe {
        let on_add = self.clone();
        let on_remove = self.clone();
        feed.subscribe(
            Box::new(move |membership: MembershipSubscription| {
                on_add.dispatch(StoreEvent::MembershipUpdated { membership });
            }),
            Box::new(move |membership: MembershipSubscription| {
                on_remove.dispatch(StoreEvent::MembershipRemoved {
                    statements_subscribe_id: membership.statements_subscribe_id,
                });
            }),
        )
    }
}

pub struct StoreRuntime {
    handle: StoreHandle,
    snapshots: watch::Receiver<DeliberationStore>,
    task: JoinHandle<DeliberationStore>,
}

impl StoreRuntime {
    pub fn spawn(store: DeliberationStore, settings: &Settings) -> Self {
        let (commands, mut inbox) = mpsc::unbounded_channel::<Envelope>();
        let (publisher, snapshots) = watch::channel(store.clone());
        let progress_interval = settings.progress_log_interval;

        let task = tokio::spawn(async move {
            let mut store = store;
            let mut applied: u64 = 0;
            while let Some(Envelope { command, reply }) = inbox.recv().await {
                let result = match command {
                    StoreCommand::Apply(event) => store.apply(event),
                    StoreCommand::ApplyRaw(raw) => store.apply_raw(&raw),
                    StoreCommand::SetSession(session) => {
                        store.set_session(session);
                        Ok(())
                    }
                    StoreCommand::WithdrawActiveRequest => store.withdraw_active_request(),
                    StoreCommand::Shutdown => {
                        if let Some(reply) = reply {
                            let _ = reply.send(Ok(()));
                        }
                        break;
                    }
                };

                applied += 1;
                if progress_interval > 0 && applied % progress_interval == 0 {
                    info!(applied, "store commands processed");
                }

                publisher.send_replace(store.clone());
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            debug!(applied, "store runtime stopped");
            store
        });

        Self {
            handle: StoreHandle { commands },
            snapshots,
            task,
        }
    }

    pub fn handle(&self) -> StoreHandle {
        self.handle.clone()
    }

    /// Latest published store.
    pub fn snapshot(&self) -> DeliberationStore {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<DeliberationStore> {
        self.snapshots.clone()
    }

    /// Drains commands queued before this call, then stops the loop and
    /// returns the final store.
    pub async fn shutdown(self) -> anyhow::Result<DeliberationStore> {
        self.handle.request(StoreCommand::Shutdown).await?;
        let store = self.task.await?;
        Ok(store)
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
