//! Polls a freshly provisioned project until Firestore and Auth answer

use std::{fmt, time::Duration};

use backend::{BackendError, DocumentStore, Project, UserDirectory};
use serde::Serialize;
use strum_macros::Display;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::config::ReadinessSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessState {
    Checking,
    NotReady,
    Ready,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    /// Still being provisioned: permission or configuration errors
    Pending(String),
    /// Anything else went wrong
    Error(String),
}

impl ProbeOutcome {
    fn from_result(result: Result<(), BackendError>) -> Self {
        match result {
            Ok(()) => Self::Ready,
            Err(e) if e.is_not_ready() => Self::Pending(e.to_string()),
            Err(e) => Self::Error(e.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Pending(e) => write!(f, "not ready ({})", e),
            Self::Error(e) => write!(f, "error ({})", e),
        }
    }
}

/// Both probes of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRound {
    pub firestore: ProbeOutcome,
    pub auth: ProbeOutcome,
}

impl ProbeRound {
    pub fn is_ready(&self) -> bool {
        self.firestore.is_ready() && self.auth.is_ready()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessReport {
    pub state: ReadinessState,
    pub attempts: u32,
    pub last_round: Option<ProbeRound>,
}

impl fmt::Display for ReadinessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            ReadinessState::Ready => write!(
                f,
                "Target project ready after {} attempt(s)",
                self.attempts
            ),
            _ => {
                write!(
                    f,
                    "Target project still not ready after {} attempt(s); verify Firestore and Authentication manually in the Firebase console",
                    self.attempts
                )?;
                if let Some(round) = &self.last_round {
                    write!(f, " [firestore: {}, auth: {}]", round.firestore, round.auth)?;
                }
                Ok(())
            }
        }
    }
}

pub struct ReadinessPoller<'a> {
    documents: &'a dyn DocumentStore,
    users: &'a dyn UserDirectory,
    probe_collection: String,
    interval: Duration,
    max_attempts: u32,
}

impl<'a> ReadinessPoller<'a> {
    pub fn new(
        target: &'a Project,
        probe_collection: impl Into<String>,
        settings: &ReadinessSettings,
    ) -> Self {
        Self {
            documents: target.documents.as_ref(),
            users: target.users.as_ref(),
            probe_collection: probe_collection.into(),
            interval: settings.interval(),
            max_attempts: settings.max_attempts.max(1),
        }
    }

    /// Run both probes once
    pub async fn check_once(&self) -> ProbeRound {
        let firestore =
            ProbeOutcome::from_result(self.documents.probe(&self.probe_collection).await);
        let auth = ProbeOutcome::from_result(self.users.probe().await);
        ProbeRound { firestore, auth }
    }

    /// Probe until both services answer in the same attempt, sleeping the
    /// configured interval between attempts, or give up once the attempt
    /// budget is spent
    pub async fn wait_until_ready(&self) -> ReadinessReport {
        info!(
            "Waiting for target services with interval {:?}, up to {} attempts",
            self.interval, self.max_attempts
        );
        let mut last_round = None;

        for attempt in 1..=self.max_attempts {
            debug!(attempt, state = %ReadinessState::Checking, "Probing target services");
            let round = self.check_once().await;

            if round.is_ready() {
                info!(attempt, state = %ReadinessState::Ready, "Target services ready");
                return ReadinessReport {
                    state: ReadinessState::Ready,
                    attempts: attempt,
                    last_round: Some(round),
                };
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                state = %ReadinessState::NotReady,
                firestore = %round.firestore,
                auth = %round.auth,
                "Target services not ready"
            );
            last_round = Some(round);

            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        warn!(
            attempts = self.max_attempts,
            state = %ReadinessState::Exhausted,
            "Giving up on readiness checks"
        );
        ReadinessReport {
            state: ReadinessState::Exhausted,
            attempts: self.max_attempts,
            last_round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(ReadinessState::NotReady.to_string(), "not-ready");
        assert_eq!(ReadinessState::Exhausted.to_string(), "exhausted");
    }

    #[test]
    fn test_probe_classification() {
        assert_eq!(ProbeOutcome::from_result(Ok(())), ProbeOutcome::Ready);
        assert!(matches!(
            ProbeOutcome::from_result(Err(BackendError::PermissionDenied("x".into()))),
            ProbeOutcome::Pending(_)
        ));
        assert!(matches!(
            ProbeOutcome::from_result(Err(BackendError::Timeout)),
            ProbeOutcome::Error(_)
        ));
    }

    #[test]
    fn test_round_needs_both() {
        let round = ProbeRound {
            firestore: ProbeOutcome::Ready,
            auth: ProbeOutcome::Pending("disabled".into()),
        };
        assert!(!round.is_ready());
    }
}
