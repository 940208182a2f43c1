use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one transfer
///
/// `Requested -> SizeChecked -> InFlight { attempt } -> Completed | Failed`.
/// A rate-limited attempt goes back to `InFlight` with the next attempt
/// number; an oversized request goes straight from `Requested` to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransferState {
    Requested,
    SizeChecked,
    InFlight { attempt: u32 },
    Completed,
    Failed { reason: String },
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed { .. })
    }

    pub fn can_transition_to(&self, next: &TransferState) -> bool {
        use TransferState::*;

        match (self, next) {
            (Requested, SizeChecked) | (Requested, Failed { .. }) => true,
            (SizeChecked, InFlight { attempt: 1 }) | (SizeChecked, Failed { .. }) => true,
            (InFlight { attempt }, InFlight { attempt: next }) => *next == attempt + 1,
            (InFlight { .. }, Completed) | (InFlight { .. }, Failed { .. }) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransferState::Requested => "requested",
            TransferState::SizeChecked => "size_checked",
            TransferState::InFlight { .. } => "in_flight",
            TransferState::Completed => "completed",
            TransferState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Chat -> local storage + catalog
    Inbound,
    /// Local file -> chat
    Outbound,
}

/// Point-in-time view of an active transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSnapshot {
    pub id: Uuid,
    pub direction: TransferDirection,
    pub name: String,
    pub state: TransferState,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            TransferState::Requested,
            TransferState::SizeChecked,
            TransferState::InFlight { attempt: 1 },
            TransferState::InFlight { attempt: 2 },
            TransferState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rejected_transitions() {
        let failed = TransferState::Failed {
            reason: "x".into(),
        };
        assert!(!TransferState::Requested.can_transition_to(&TransferState::InFlight { attempt: 1 }));
        assert!(!TransferState::InFlight { attempt: 1 }.can_transition_to(&TransferState::InFlight { attempt: 3 }));
        assert!(!TransferState::Completed.can_transition_to(&failed));
        assert!(!failed.can_transition_to(&TransferState::Requested));
        assert!(TransferState::Requested.can_transition_to(&failed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Failed { reason: String::new() }.is_terminal());
        assert!(!TransferState::InFlight { attempt: 4 }.is_terminal());
    }
}
