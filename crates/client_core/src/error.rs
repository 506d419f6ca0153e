use shared::error::{ApiError, ErrorCode};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

/// Which shape rule a payload broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("expected an object")]
    NotAnObject,
    #[error("expected an array")]
    NotAnArray,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("empty identifier `{0}`")]
    EmptyIdentifier(&'static str),
    #[error("malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {entity}: {failure}")]
pub struct ValidationError {
    pub entity: &'static str,
    pub failure: ValidationFailure,
}

impl ValidationError {
    pub fn new(entity: &'static str, failure: ValidationFailure) -> Self {
        Self { entity, failure }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("missing identifier: {what}")]
    MissingIdentifier { what: &'static str },
}

impl StoreError {
    pub fn missing(what: &'static str) -> Self {
        StoreError::MissingIdentifier { what }
    }
}

impl From<&StoreError> for ApiError {
    fn from(value: &StoreError) -> Self {
        let code = match value {
            StoreError::Validation(_) => ErrorCode::Validation,
            StoreError::MissingIdentifier { .. } => ErrorCode::MissingIdentifier,
        };
        ApiError::new(code, value.to_string())
    }
}

/// Observability sink for mutations that were rejected at the store boundary.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, operation: &'static str, err: &StoreError);
}

pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, operation: &'static str, err: &StoreError) {
        warn!(operation, error = %err, "store mutation rejected");
    }
}

#[derive(Debug, Clone)]
pub struct RejectedMutation {
    pub operation: &'static str,
    pub error: StoreError,
}

/// Logs like [`TracingReporter`] and also fans rejections out to subscribers.
pub struct BroadcastReporter {
    events: broadcast::Sender<RejectedMutation>,
}

impl BroadcastReporter {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RejectedMutation> {
        self.events.subscribe()
    }
}

impl ErrorReporter for BroadcastReporter {
    fn report(&self, operation: &'static str, err: &StoreError) {
        TracingReporter.report(operation, err);
        let _ = self.events.send(RejectedMutation {
            operation,
            error: err.clone(),
        });
    }
}
