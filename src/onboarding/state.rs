//! Onboarding state machine — which step a participant has completed.

use serde::{Deserialize, Serialize};

use super::model::{Choice, Domain, ResearcherType, Selection};

/// The steps of the onboarding sequence.
///
/// Progresses linearly: NotStarted → MemberGranted → DomainSelected → Complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    NotStarted,
    MemberGranted,
    DomainSelected,
    Complete,
}

impl OnboardingStep {
    /// Total number of steps shown to admins ("Step: n/3").
    pub const TOTAL: u8 = 3;

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (NotStarted, MemberGranted) | (MemberGranted, DomainSelected) | (DomainSelected, Complete)
        )
    }

    /// Furthest-completed step number, 0 for NotStarted.
    pub fn number(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::MemberGranted => 1,
            Self::DomainSelected => 2,
            Self::Complete => 3,
        }
    }

    /// The step reached once `selection` has been granted.
    pub fn after(selection: Selection) -> OnboardingStep {
        match selection {
            Selection::Domain(_) => Self::DomainSelected,
            Selection::Researcher(_) => Self::Complete,
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::MemberGranted => "member_granted",
            Self::DomainSelected => "domain_selected",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Per-participant progress bookkeeping.
///
/// Advisory only: held roles, not this record, decide whether a participant
/// has already chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub step: OnboardingStep,
    pub domain: Option<Domain>,
    pub researcher_type: Option<ResearcherType>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            step: OnboardingStep::MemberGranted,
            domain: None,
            researcher_type: None,
        }
    }
}

impl ProgressRecord {
    /// Record a granted selection in place.
    ///
    /// Out-of-order selections are recorded anyway; the step jumps to the one
    /// implied by the selection.
    pub fn apply(&mut self, selection: Selection) {
        let target = OnboardingStep::after(selection);
        if !self.step.can_transition_to(target) {
            tracing::debug!(from = %self.step, to = %target, "Out-of-sequence progress update");
        }
        match selection {
            Selection::Domain(d) => self.domain = Some(d),
            Selection::Researcher(r) => self.researcher_type = Some(r),
        }
        self.step = target;
    }

    /// Label of the chosen domain, or "Not selected".
    pub fn domain_label(&self) -> &'static str {
        self.domain.map(Choice::label).unwrap_or(NOT_SELECTED)
    }

    /// Label of the chosen researcher type, or "Not selected".
    pub fn researcher_label(&self) -> &'static str {
        self.researcher_type
            .map(Choice::label)
            .unwrap_or(NOT_SELECTED)
    }
}

const NOT_SELECTED: &str = "Not selected";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use OnboardingStep::*;
        let transitions = [
            (NotStarted, MemberGranted),
            (MemberGranted, DomainSelected),
            (DomainSelected, Complete),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use OnboardingStep::*;
        // Skip steps
        assert!(!NotStarted.can_transition_to(DomainSelected));
        assert!(!MemberGranted.can_transition_to(Complete));
        // Go backward
        assert!(!DomainSelected.can_transition_to(MemberGranted));
        // Terminal
        assert!(!Complete.can_transition_to(NotStarted));
        // Self-transition
        assert!(!MemberGranted.can_transition_to(MemberGranted));
    }

    #[test]
    fn step_numbers_count_up_to_total() {
        use OnboardingStep::*;
        let steps = [NotStarted, MemberGranted, DomainSelected, Complete];
        for pair in steps.windows(2) {
            assert_eq!(pair[1].number(), pair[0].number() + 1);
        }
        assert_eq!(Complete.number(), OnboardingStep::TOTAL);
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStep::*;
        for step in [NotStarted, MemberGranted, DomainSelected, Complete] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "Display and serde should match for {step:?}");
        }
    }

    #[test]
    fn new_record_is_step_one() {
        let record = ProgressRecord::default();
        assert_eq!(record.step.number(), 1);
        assert_eq!(record.domain_label(), "Not selected");
        assert_eq!(record.researcher_label(), "Not selected");
    }

    #[test]
    fn apply_walks_record_through_flow() {
        let mut record = ProgressRecord::default();

        record.apply(Selection::Domain(Domain::CsMath));
        assert_eq!(record.step, OnboardingStep::DomainSelected);
        assert_eq!(record.domain_label(), "CS/Math");

        record.apply(Selection::Researcher(ResearcherType::Casual));
        assert_eq!(record.step, OnboardingStep::Complete);
        assert_eq!(record.researcher_label(), "Casual");
        assert_eq!(record.domain, Some(Domain::CsMath));
    }

    #[test]
    fn apply_researcher_before_domain_still_records() {
        let mut record = ProgressRecord::default();
        record.apply(Selection::Researcher(ResearcherType::Dedicated));
        assert_eq!(record.step.number(), 3);
        assert!(record.domain.is_none());
        assert_eq!(record.researcher_type, Some(ResearcherType::Dedicated));
    }
}
