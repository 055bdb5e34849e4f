//! Typed handle over either provider workflow, owned by a client workflow.

use tracing::debug;

use super::fixed_rate::{FixedRateContext, FixedRateEvent, FixedRateMachine, FixedRateState};
use super::harvest::{HarvestContext, HarvestEvent, HarvestMachine, HarvestState};
use super::machine::Workflow;
use crate::calendar::MonthWindow;
use crate::harvest::Credentials;
use crate::records::{EntityId, ProviderData, ProviderKind};
use crate::report::CalculatedReport;

/// Asynchronous work a provider needs done on its behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    ValidateCredentials(Credentials),
    FetchTimeEntries(Credentials, MonthWindow),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutput {
    Request(ProviderRequest),
    CalculateSuccess(CalculatedReport),
    CalculateFailure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Harvest(HarvestEvent),
    FixedRate(FixedRateEvent),
    Calculate(MonthWindow),
    Edit,
}

/// Terminal status the client review step guards on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug)]
pub enum ProviderFlow {
    Harvest(Workflow<HarvestMachine>),
    FixedRate(Workflow<FixedRateMachine>),
}

impl ProviderFlow {
    /// Spawns a provider from committed data, idle and ready to calculate.
    pub fn ready(id: EntityId, data: &ProviderData) -> (Self, Vec<ProviderOutput>) {
        match data {
            ProviderData::Harvest(data) => {
                let (wf, out) = Workflow::spawn(id, HarvestContext::seeded(data.clone()));
                (ProviderFlow::Harvest(wf), out)
            }
            ProviderData::FixedRate(data) => {
                let (wf, out) = Workflow::spawn(id, FixedRateContext::seeded(data.clone()));
                (ProviderFlow::FixedRate(wf), out)
            }
        }
    }

    /// Spawns a provider at its first input, seeded from any existing data.
    pub fn for_editing(
        id: EntityId,
        kind: ProviderKind,
        seed: Option<&ProviderData>,
    ) -> (Self, Vec<ProviderOutput>) {
        let seed = match (kind, seed) {
            (_, Some(data)) if data.kind() == kind => data.clone(),
            (ProviderKind::Harvest, _) => ProviderData::Harvest(Default::default()),
            (ProviderKind::FixedRate, _) => ProviderData::FixedRate(Default::default()),
        };
        let (mut flow, mut outputs) = Self::ready(id, &seed);
        if flow.is_idle() {
            outputs.extend(flow.send(ProviderEvent::Edit));
        }
        (flow, outputs)
    }

    pub fn send(&mut self, event: ProviderEvent) -> Vec<ProviderOutput> {
        match (self, event) {
            (ProviderFlow::Harvest(wf), ProviderEvent::Harvest(ev)) => wf.send(ev),
            (ProviderFlow::Harvest(wf), ProviderEvent::Calculate(window)) => {
                wf.send(HarvestEvent::Calculate(window))
            }
            (ProviderFlow::Harvest(wf), ProviderEvent::Edit) => wf.send(HarvestEvent::Edit),
            (ProviderFlow::FixedRate(wf), ProviderEvent::FixedRate(ev)) => wf.send(ev),
            (ProviderFlow::FixedRate(wf), ProviderEvent::Calculate(_)) => {
                wf.send(FixedRateEvent::Calculate)
            }
            (ProviderFlow::FixedRate(wf), ProviderEvent::Edit) => wf.send(FixedRateEvent::Edit),
            (flow, event) => {
                debug!(
                    kind = %flow.kind(),
                    state = %flow.state_name(),
                    ?event,
                    "event for another provider kind ignored"
                );
                Vec::new()
            }
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderFlow::Harvest(_) => ProviderKind::Harvest,
            ProviderFlow::FixedRate(_) => ProviderKind::FixedRate,
        }
    }

    pub fn status(&self) -> ProviderStatus {
        match self {
            ProviderFlow::Harvest(wf) => match wf.state() {
                HarvestState::Success => ProviderStatus::Confirmed,
                HarvestState::Failure => ProviderStatus::Failed,
                _ => ProviderStatus::Pending,
            },
            ProviderFlow::FixedRate(wf) => match wf.state() {
                FixedRateState::Success => ProviderStatus::Confirmed,
                _ => ProviderStatus::Pending,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status() != ProviderStatus::Pending
    }

    fn is_idle(&self) -> bool {
        match self {
            ProviderFlow::Harvest(wf) => wf.state() == HarvestState::Idle,
            ProviderFlow::FixedRate(wf) => wf.state() == FixedRateState::Idle,
        }
    }

    /// Snapshot of the provider's current settings.
    pub fn data(&self) -> ProviderData {
        match self {
            ProviderFlow::Harvest(wf) => ProviderData::Harvest(wf.context().data.clone()),
            ProviderFlow::FixedRate(wf) => ProviderData::FixedRate(wf.context().data.clone()),
        }
    }

    /// Name of the current state, used to pick the prompt to show.
    pub fn state_name(&self) -> String {
        match self {
            ProviderFlow::Harvest(wf) => wf.state().to_string(),
            ProviderFlow::FixedRate(wf) => wf.state().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{FixedRateData, HarvestData};

    fn fixed(rate: &str) -> ProviderData {
        ProviderData::FixedRate(FixedRateData {
            rate: rate.into(),
            description: "Retainer".into(),
        })
    }

    #[test]
    fn ready_flow_is_idle_and_pending() {
        let (flow, outputs) = ProviderFlow::ready("c1".into(), &fixed("100"));
        assert!(outputs.is_empty());
        assert_eq!(flow.kind(), ProviderKind::FixedRate);
        assert_eq!(flow.state_name(), "idle");
        assert_eq!(flow.status(), ProviderStatus::Pending);
    }

    #[test]
    fn editing_starts_at_first_input_with_seed() {
        let (flow, _) = ProviderFlow::for_editing("c1".into(), ProviderKind::FixedRate, Some(&fixed("100")));
        assert_eq!(flow.state_name(), "rate");
        assert_eq!(flow.data(), fixed("100"));
    }

    #[test]
    fn editing_ignores_seed_of_other_kind() {
        let (flow, _) = ProviderFlow::for_editing("c1".into(), ProviderKind::Harvest, Some(&fixed("100")));
        assert_eq!(flow.kind(), ProviderKind::Harvest);
        assert_eq!(flow.state_name(), "accountId");
        assert_eq!(flow.data(), ProviderData::Harvest(HarvestData::default()));
    }

    #[test]
    fn fixed_rate_confirms_after_description() {
        let (mut flow, _) = ProviderFlow::for_editing("c1".into(), ProviderKind::FixedRate, None);
        flow.send(ProviderEvent::FixedRate(FixedRateEvent::Rate("10".into())));
        assert!(!flow.is_terminal());
        flow.send(ProviderEvent::FixedRate(FixedRateEvent::Description("x".into())));
        assert_eq!(flow.status(), ProviderStatus::Confirmed);
    }

    #[test]
    fn mismatched_events_are_ignored() {
        let (mut flow, _) = ProviderFlow::for_editing("c1".into(), ProviderKind::FixedRate, None);
        let outputs = flow.send(ProviderEvent::Harvest(HarvestEvent::AccountId("1".into())));
        assert!(outputs.is_empty());
        assert_eq!(flow.state_name(), "rate");
    }

    #[test]
    fn calculate_is_translated_per_kind() {
        let (mut flow, _) = ProviderFlow::ready("c1".into(), &fixed("100"));
        let outputs = flow.send(ProviderEvent::Calculate(MonthWindow::new(2024, 1).unwrap()));
        assert!(matches!(outputs.as_slice(), [ProviderOutput::CalculateSuccess(_)]));
    }
}
