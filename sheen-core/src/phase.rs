/// Lifecycle of a single trial.
///
/// States only move forward: `Idle → PhaseOneDisplayed → [PhaseTwoDisplayed] → Armed → Ended`.
/// Steps may be skipped (a `NO_KEYS` trial never arms) but never re-entered.
#[derive(Copy, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TrialState {
    #[default]
    Idle,
    PhaseOneDisplayed,
    PhaseTwoDisplayed,
    Armed,
    Ended,
}

impl TrialState {
    pub fn can_advance_to(self, next: TrialState) -> bool {
        next > self
    }

    pub fn accepts_responses(self) -> bool {
        matches!(self, TrialState::Armed)
    }

    pub fn is_displayed(self) -> bool {
        matches!(
            self,
            TrialState::PhaseOneDisplayed | TrialState::PhaseTwoDisplayed | TrialState::Armed
        )
    }

    pub fn is_ended(self) -> bool {
        matches!(self, TrialState::Ended)
    }
}
