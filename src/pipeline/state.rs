//! Invocation state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an invocation is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Invocation constructed.
    Received,
    /// Policy table and before-hooks evaluated.
    PolicyChecked,
    /// Allowed without asking anyone.
    AutoAllowed,
    /// Denied by a rule or a guard.
    AutoDenied,
    /// Waiting on the approval channel.
    AwaitingApproval,
    /// The tool ran (successfully or not).
    Executed,
    /// Approval was refused or timed out. The tool never ran.
    Cancelled,
    /// Audit record written.
    Audited,
}

impl InvocationState {
    pub fn can_transition_to(&self, target: InvocationState) -> bool {
        use InvocationState::*;

        matches!(
            (self, target),
            (Received, PolicyChecked)
                | (PolicyChecked, AutoAllowed)
                | (PolicyChecked, AutoDenied)
                | (PolicyChecked, AwaitingApproval)
                | (AutoAllowed, Executed)
                | (AwaitingApproval, Executed)
                | (AwaitingApproval, Cancelled)
                | (AutoDenied, Audited)
                | (Executed, Audited)
                | (Cancelled, Audited)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Audited)
    }
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::PolicyChecked => "policy_checked",
            Self::AutoAllowed => "auto_allowed",
            Self::AutoDenied => "auto_denied",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
            Self::Audited => "audited",
        };
        write!(f, "{}", s)
    }
}

/// A state transition event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: InvocationState,
    pub to: InvocationState,
    pub timestamp: DateTime<Utc>,
}

/// The path one invocation took through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationTrace {
    state: InvocationState,
    transitions: Vec<StateTransition>,
}

impl InvocationTrace {
    pub fn new() -> Self {
        Self {
            state: InvocationState::Received,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Every state visited, starting with `Received`.
    pub fn path(&self) -> Vec<InvocationState> {
        std::iter::once(InvocationState::Received)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    pub fn transition_to(&mut self, new_state: InvocationState) -> Result<(), String> {
        if !self.state.can_transition_to(new_state) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.state, new_state
            ));
        }

        self.transitions.push(StateTransition {
            from: self.state,
            to: new_state,
            timestamp: Utc::now(),
        });
        self.state = new_state;
        Ok(())
    }

    /// Transition, logging instead of failing on an invalid move.
    pub(crate) fn advance(&mut self, new_state: InvocationState) {
        if let Err(e) = self.transition_to(new_state) {
            tracing::error!("Invocation state machine: {}", e);
        }
    }
}

impl Default for InvocationTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InvocationState::*;

    #[test]
    fn test_state_transitions() {
        assert!(Received.can_transition_to(PolicyChecked));
        assert!(AwaitingApproval.can_transition_to(Executed));
        assert!(!AutoDenied.can_transition_to(Executed));
        assert!(!Cancelled.can_transition_to(Executed));
        assert!(!Audited.can_transition_to(Received));
    }

    #[test]
    fn test_only_audited_is_terminal() {
        assert!(Audited.is_terminal());
        assert!(!Cancelled.is_terminal());
        assert!(!Executed.is_terminal());
    }

    #[test]
    fn test_trace_path() {
        let mut trace = InvocationTrace::new();
        for state in [PolicyChecked, AwaitingApproval, Cancelled, Audited] {
            trace.transition_to(state).unwrap();
        }
        assert_eq!(
            trace.path(),
            vec![Received, PolicyChecked, AwaitingApproval, Cancelled, Audited]
        );
        assert!(trace.state().is_terminal());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut trace = InvocationTrace::new();
        let err = trace.transition_to(Executed).unwrap_err();
        assert_eq!(err, "Cannot transition from received to executed");
        assert_eq!(trace.state(), Received);
    }
}
