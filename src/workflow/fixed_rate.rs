//! Fixed-rate provider: one amount and a description per invoice.

use std::fmt;

use super::fields::{self, FormSchema};
use super::machine::{Machine, Step};
use super::provider::ProviderOutput;
use crate::records::FixedRateData;
use crate::report;

pub struct FixedRateMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedRateState {
    Idle,
    Rate,
    Description,
    Success,
    Format,
}

impl fmt::Display for FixedRateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedRateState::Idle => write!(f, "idle"),
            FixedRateState::Rate => write!(f, "rate"),
            FixedRateState::Description => write!(f, "description"),
            FixedRateState::Success => write!(f, "success"),
            FixedRateState::Format => write!(f, "format"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixedRateContext {
    pub data: FixedRateData,
    pub fields: FormSchema,
}

impl FixedRateContext {
    pub fn seeded(data: FixedRateData) -> Self {
        Self {
            data,
            fields: fields::fixed_rate_schema(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedRateEvent {
    Edit,
    Rate(String),
    Description(String),
    Calculate,
}

impl Machine for FixedRateMachine {
    type State = FixedRateState;
    type Context = FixedRateContext;
    type Event = FixedRateEvent;
    type Output = ProviderOutput;

    const NAME: &'static str = "fixed-rate-provider";

    fn initial() -> FixedRateState {
        FixedRateState::Idle
    }

    fn on_event(state: FixedRateState, mut ctx: FixedRateContext, event: FixedRateEvent) -> Step<Self> {
        use FixedRateEvent as E;
        use FixedRateState as S;

        match (state, event) {
            (S::Idle | S::Success, E::Edit) => Step::to(S::Rate, ctx),
            (S::Rate, E::Rate(rate)) if !rate.trim().is_empty() => {
                ctx.data.rate = rate.trim().to_string();
                Step::to(S::Description, ctx)
            }
            (S::Description, E::Description(description)) => {
                ctx.data.description = description.trim().to_string();
                Step::to(S::Success, ctx)
            }
            (S::Idle | S::Success, E::Calculate) => Step::to(S::Format, ctx),
            _ => Step::stay(ctx),
        }
    }

    fn on_enter(state: FixedRateState, ctx: FixedRateContext) -> Step<Self> {
        match state {
            FixedRateState::Idle if ctx.data.rate.is_empty() => Step::to(FixedRateState::Rate, ctx),
            FixedRateState::Format => {
                let output = match report::fixed_report(&ctx.data) {
                    Ok(report) => ProviderOutput::CalculateSuccess(report),
                    Err(e) => ProviderOutput::CalculateFailure(e.to_string()),
                };
                Step::to(FixedRateState::Idle, ctx).emit(output)
            }
            _ => Step::stay(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::machine::Workflow;
    use rust_decimal_macros::dec;

    fn spawn(rate: &str) -> Workflow<FixedRateMachine> {
        let data = FixedRateData {
            rate: rate.into(),
            description: "Retainer".into(),
        };
        Workflow::spawn("c1".into(), FixedRateContext::seeded(data)).0
    }

    #[test]
    fn empty_provider_asks_for_rate() {
        let wf = spawn("");
        assert_eq!(wf.state(), FixedRateState::Rate);
    }

    #[test]
    fn rate_then_description_succeeds() {
        let mut wf = spawn("");
        wf.send(FixedRateEvent::Rate("1200".into()));
        assert_eq!(wf.state(), FixedRateState::Description);
        wf.send(FixedRateEvent::Description("Monthly support".into()));
        assert_eq!(wf.state(), FixedRateState::Success);
        assert_eq!(wf.context().data.rate, "1200");
        assert_eq!(wf.context().data.description, "Monthly support");
    }

    #[test]
    fn blank_rate_is_ignored() {
        let mut wf = spawn("");
        wf.send(FixedRateEvent::Rate(" ".into()));
        assert_eq!(wf.state(), FixedRateState::Rate);
    }

    #[test]
    fn calculate_reports_single_row() {
        let mut wf = spawn("1500.25");
        assert_eq!(wf.state(), FixedRateState::Idle);

        let outputs = wf.send(FixedRateEvent::Calculate);
        assert_eq!(wf.state(), FixedRateState::Idle);
        match outputs.as_slice() {
            [ProviderOutput::CalculateSuccess(report)] => {
                assert_eq!(report.report.len(), 1);
                assert_eq!(report.report[0].amount, dec!(1500.25));
                assert_eq!(report.report[0].project_name, "Retainer");
            }
            other => panic!("unexpected outputs: {other:?}"),
        }
    }

    #[test]
    fn unparsable_rate_reports_failure() {
        let mut wf = spawn("twelve");
        let outputs = wf.send(FixedRateEvent::Calculate);
        assert!(matches!(outputs.as_slice(), [ProviderOutput::CalculateFailure(_)]));
        assert_eq!(wf.state(), FixedRateState::Idle);
    }

    #[test]
    fn edit_restarts_at_rate() {
        let mut wf = spawn("100");
        wf.send(FixedRateEvent::Edit);
        assert_eq!(wf.state(), FixedRateState::Rate);
        assert_eq!(wf.context().data.rate, "100");
    }
}
