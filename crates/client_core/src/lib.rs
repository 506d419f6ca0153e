//! Client-side reconciliation of room join requests, lobby rooms, and
//! discussion memberships fed by a real-time document store.

pub mod config;
pub mod error;
pub mod membership;
pub mod password_gate;
pub mod reconcile;
pub mod rooms;
pub mod runtime;
pub mod selectors;
pub mod store;
pub mod subscription;
pub mod validate;

pub use config::{load_settings, Settings};
pub use error::{
    BroadcastReporter, ErrorReporter, RejectedMutation, StoreError, TracingReporter,
    ValidationError, ValidationFailure,
};
pub use password_gate::{
    GateError, GateOutcome, GateState, PasswordGate, PasswordVerifier, MAX_TRIES, PASSWORD_LENGTH,
};
pub use runtime::{DispatchError, StoreHandle, StoreRuntime};
pub use store::{DeliberationStore, SessionContext};
pub use subscription::{BroadcastFeed, Callback, Change, EntityFeed, Unsubscribe};
