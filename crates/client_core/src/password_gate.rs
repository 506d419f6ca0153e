use async_trait::async_trait;
use shared::domain::{StatementId, UserId};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;

pub const PASSWORD_LENGTH: usize = 4;
pub const MAX_TRIES: u8 = 3;

/// Checks a passcode against the backing store for a discussion.
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    async fn check_password(
        &self,
        code: u32,
        statement_id: &StatementId,
        user_id: &UserId,
    ) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked { tries_left: u8 },
    Unlocked,
    LockedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Unlocked,
    Rejected { tries_left: u8 },
    /// Emitted once, on the attempt that used up the budget.
    LockedOut,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("missing identifier: {what}")]
    MissingIdentifier { what: &'static str },
    #[error("passcode must be exactly {expected_len} digits")]
    InvalidCode { expected_len: usize },
    #[error("password verification failed: {0}")]
    Verifier(#[source] anyhow::Error),
    #[error("no attempts left")]
    LockedOut,
}

/// Retry budget around a [`PasswordVerifier`].
///
/// Only a verifier answer of `false` costs an attempt. Malformed input,
/// missing ids, and verifier errors leave the counter alone.
#[derive(Debug, Clone)]
pub struct PasswordGate {
    state: GateState,
    password_length: usize,
}

impl Default for PasswordGate {
    fn default() -> Self {
        Self::new(PASSWORD_LENGTH, MAX_TRIES)
    }
}

impl PasswordGate {
    pub fn new(password_length: usize, max_tries: u8) -> Self {
        let state = if max_tries == 0 {
            GateState::LockedOut
        } else {
            GateState::Locked {
                tries_left: max_tries,
            }
        };
        Self {
            state,
            password_length,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.password_length, settings.max_password_tries)
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn tries_left(&self) -> u8 {
        match self.state {
            GateState::Locked { tries_left } => tries_left,
            GateState::Unlocked => 0,
            GateState::LockedOut => 0,
        }
    }

    pub async fn submit(
        &mut self,
        digits: &str,
        statement_id: Option<&StatementId>,
        user_id: Option<&UserId>,
        verifier: &dyn PasswordVerifier,
    ) -> Result<GateOutcome, GateError> {
        let tries_left = match self.state {
            GateState::Unlocked => return Ok(GateOutcome::Unlocked),
            GateState::LockedOut => return Err(GateError::LockedOut),
            GateState::Locked { tries_left } => tries_left,
        };

        let statement_id = statement_id
            .filter(|id| !id.is_blank())
            .ok_or(GateError::MissingIdentifier {
                what: "statement_id",
            })?;
        let user_id = user_id
            .filter(|id| !id.is_blank())
            .ok_or(GateError::MissingIdentifier { what: "user_id" })?;
        let code = self.parse_code(digits)?;

        let accepted = verifier
            .check_password(code, statement_id, user_id)
            .await
            .map_err(|err| {
                warn!(statement_id = %statement_id, error = %err, "password check errored");
                GateError::Verifier(err)
            })?;

        if accepted {
            info!(statement_id = %statement_id, user_id = %user_id, "password gate unlocked");
            self.state = GateState::Unlocked;
            return Ok(GateOutcome::Unlocked);
        }

        let tries_left = tries_left.saturating_sub(1);
        if tries_left == 0 {
            warn!(statement_id = %statement_id, user_id = %user_id, "password gate locked out");
            self.state = GateState::LockedOut;
            return Ok(GateOutcome::LockedOut);
        }
        self.state = GateState::Locked { tries_left };
        Ok(GateOutcome::Rejected { tries_left })
    }

    fn parse_code(&self, digits: &str) -> Result<u32, GateError> {
        let invalid = GateError::InvalidCode {
            expected_len: self.password_length,
        };
        if digits.len() != self.password_length || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid);
        }
        digits.parse().map_err(|_| invalid)
    }
}

#[cfg(test)]
#[path = "tests/password_gate_tests.rs"]
mod tests;
