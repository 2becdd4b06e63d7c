//! Finite state machine for the deployment lifecycle

use serde::{Deserialize, Serialize};

/// Deployment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Created, pipeline not started yet
    Pending,

    /// Repository fetch in progress
    Fetching,

    /// Child process being spawned
    Starting,

    /// Supervised process is live
    Running,

    /// Pipeline failed; reason recorded
    Failed,

    /// Explicitly stopped
    Stopped,

    /// Removed; record is deleted right after this transition
    Deleted,
}

impl DeploymentStatus {
    /// Terminal states never transition again except to Deleted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Failed | DeploymentStatus::Stopped | DeploymentStatus::Deleted
        )
    }
}

/// Deployment lifecycle event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Begin fetching the repository
    Fetch,

    /// Fetch succeeded, begin spawning the process
    Spawn,

    /// Process spawned, deployment is live
    Started,

    /// A pipeline step failed
    Fail(String),

    /// Explicit stop of a live deployment
    Stop,

    /// Deployment is being removed
    Delete,
}

/// Per-deployment lifecycle FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    status: DeploymentStatus,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in the Pending state
    pub fn new() -> Self {
        Self {
            status: DeploymentStatus::Pending,
            error: None,
        }
    }

    /// Get the current status
    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    /// Get the recorded failure reason, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition. Status never regresses; the only
    /// exits from a non-terminal state are the next pipeline step, Stop,
    /// Fail, or Delete.
    pub fn process(&mut self, event: DeploymentEvent) -> Result<DeploymentStatus, String> {
        let next = match (&self.status, &event) {
            (DeploymentStatus::Pending, DeploymentEvent::Fetch) => DeploymentStatus::Fetching,

            (DeploymentStatus::Fetching, DeploymentEvent::Spawn) => DeploymentStatus::Starting,

            (DeploymentStatus::Starting, DeploymentEvent::Started) => DeploymentStatus::Running,

            // A live process can be stopped while still Starting
            (DeploymentStatus::Starting | DeploymentStatus::Running, DeploymentEvent::Stop) => {
                DeploymentStatus::Stopped
            }

            // Any non-terminal state can fail
            (status, DeploymentEvent::Fail(reason)) if !status.is_terminal() => {
                self.error = Some(reason.clone());
                DeploymentStatus::Failed
            }

            // Delete is allowed from anywhere except an already-deleted entry
            (status, DeploymentEvent::Delete) if *status != DeploymentStatus::Deleted => {
                DeploymentStatus::Deleted
            }

            (status, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", status, event));
            }
        };

        self.status = next;
        Ok(next)
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fsm_happy_path() {
        let mut fsm = DeploymentFsm::new();
        assert_eq!(fsm.status(), DeploymentStatus::Pending);

        fsm.process(DeploymentEvent::Fetch).unwrap();
        assert_eq!(fsm.status(), DeploymentStatus::Fetching);

        fsm.process(DeploymentEvent::Spawn).unwrap();
        assert_eq!(fsm.status(), DeploymentStatus::Starting);

        fsm.process(DeploymentEvent::Started).unwrap();
        assert_eq!(fsm.status(), DeploymentStatus::Running);

        fsm.process(DeploymentEvent::Stop).unwrap();
        assert_eq!(fsm.status(), DeploymentStatus::Stopped);
    }

    #[test]
    fn test_fsm_fetch_failure() {
        let mut fsm = DeploymentFsm::new();

        fsm.process(DeploymentEvent::Fetch).unwrap();
        fsm.process(DeploymentEvent::Fail("clone failed".to_string()))
            .unwrap();

        assert_eq!(fsm.status(), DeploymentStatus::Failed);
        assert_eq!(fsm.error(), Some("clone failed"));
    }

    #[test]
    fn test_fsm_terminal_states_reject_pipeline_events() {
        let mut fsm = DeploymentFsm::new();
        fsm.process(DeploymentEvent::Fetch).unwrap();
        fsm.process(DeploymentEvent::Fail("boom".to_string())).unwrap();

        assert!(fsm.process(DeploymentEvent::Spawn).is_err());
        assert!(fsm.process(DeploymentEvent::Stop).is_err());
        assert!(fsm.process(DeploymentEvent::Fail("again".to_string())).is_err());
    }
}
