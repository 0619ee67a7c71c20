// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery status state machine.
//!
//! The happy path is `Sending -> Sent -> Delivered -> Read`. The single
//! exceptional automatic edge is `Sending -> Failed`; `Failed -> Sending` is
//! admitted only as the manual user-retry reset. All transitions go through
//! [`DeliveryState::transition`] so a backward move or a skip out of `Failed`
//! is rejected as a contract violation instead of silently applied.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use crate::error::GuildsyncError;

/// Delivery status of a message as tracked by the remote store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryState {
    /// Whether the automatic machinery admits moving from `self` to `to`.
    ///
    /// `Failed -> Sending` is the manual retry reset and is the only edge
    /// out of `Failed`.
    pub fn can_transition(self, to: DeliveryState) -> bool {
        use DeliveryState::*;
        matches!(
            (self, to),
            (Sending, Sent) | (Sent, Delivered) | (Delivered, Read) | (Sending, Failed) | (Failed, Sending)
        )
    }

    /// Validate and apply a transition.
    ///
    /// Invalid transitions are logged and returned as
    /// [`GuildsyncError::InvalidTransition`]; the current state is left
    /// untouched by the caller in that case.
    pub fn transition(self, to: DeliveryState) -> Result<DeliveryState, GuildsyncError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            warn!(from = %self, to = %to, "rejected delivery status transition");
            Err(GuildsyncError::InvalidTransition { from: self, to })
        }
    }

    /// Terminal states for the automatic machinery. `Failed` still admits
    /// the manual reset edge.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeliveryState::Delivered | DeliveryState::Read | DeliveryState::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [DeliveryState; 5] = [
        DeliveryState::Sending,
        DeliveryState::Sent,
        DeliveryState::Delivered,
        DeliveryState::Read,
        DeliveryState::Failed,
    ];

    #[test]
    fn happy_path_is_admitted() {
        let state = DeliveryState::Sending;
        let state = state.transition(DeliveryState::Sent).unwrap();
        let state = state.transition(DeliveryState::Delivered).unwrap();
        let state = state.transition(DeliveryState::Read).unwrap();
        assert_eq!(state, DeliveryState::Read);
    }

    #[test]
    fn failure_edge_and_manual_reset() {
        let state = DeliveryState::Sending.transition(DeliveryState::Failed).unwrap();
        assert!(state.is_terminal());
        // Manual retry resets back to Sending.
        assert_eq!(
            state.transition(DeliveryState::Sending).unwrap(),
            DeliveryState::Sending
        );
    }

    #[test]
    fn backward_moves_are_rejected() {
        let err = DeliveryState::Read.transition(DeliveryState::Sent).unwrap_err();
        assert!(matches!(err, GuildsyncError::InvalidTransition { .. }));
        assert!(DeliveryState::Delivered
            .transition(DeliveryState::Sending)
            .is_err());
    }

    #[test]
    fn failed_cannot_skip_to_delivered() {
        assert!(DeliveryState::Failed
            .transition(DeliveryState::Delivered)
            .is_err());
        assert!(DeliveryState::Failed.transition(DeliveryState::Sent).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!DeliveryState::Sending.is_terminal());
        assert!(!DeliveryState::Sent.is_terminal());
        assert!(DeliveryState::Delivered.is_terminal());
        assert!(DeliveryState::Read.is_terminal());
        assert!(DeliveryState::Failed.is_terminal());
    }

    fn any_state() -> impl Strategy<Value = DeliveryState> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        /// transition() agrees with can_transition() on every pair.
        #[test]
        fn transition_matches_validator(from in any_state(), to in any_state()) {
            let applied = from.transition(to);
            prop_assert_eq!(applied.is_ok(), from.can_transition(to));
            if let Ok(next) = applied {
                prop_assert_eq!(next, to);
            }
        }

        /// No admitted edge ever moves backward along the happy path.
        #[test]
        fn no_backward_happy_path_edges(from in any_state(), to in any_state()) {
            fn rank(s: DeliveryState) -> Option<u8> {
                match s {
                    DeliveryState::Sending => Some(0),
                    DeliveryState::Sent => Some(1),
                    DeliveryState::Delivered => Some(2),
                    DeliveryState::Read => Some(3),
                    DeliveryState::Failed => None,
                }
            }
            if let (Some(a), Some(b)) = (rank(from), rank(to)) {
                if from.can_transition(to) {
                    prop_assert!(b > a);
                }
            }
        }
    }
}
