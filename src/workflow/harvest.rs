//! Remote-hours provider backed by Harvest time entries.

use std::fmt;

use rust_decimal::Decimal;

use super::fields::{self, FormSchema};
use super::machine::{Machine, Step};
use super::provider::{ProviderOutput, ProviderRequest};
use crate::calendar::MonthWindow;
use crate::harvest::{Credentials, HarvestUser, TimeEntry};
use crate::records::{ContractType, HarvestData};
use crate::report::{self, HourTotals};

pub struct HarvestMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Idle,
    AccountId,
    Token,
    TypeOfContract,
    FlatSalary,
    HourlyRate,
    Loading,
    Retry,
    Success,
    Failure,
    Calculate,
    Format,
}

impl fmt::Display for HarvestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarvestState::Idle => "idle",
            HarvestState::AccountId => "accountId",
            HarvestState::Token => "token",
            HarvestState::TypeOfContract => "typeOfContract",
            HarvestState::FlatSalary => "flat_salary",
            HarvestState::HourlyRate => "hourly_rate",
            HarvestState::Loading => "loading",
            HarvestState::Retry => "retry",
            HarvestState::Success => "success",
            HarvestState::Failure => "failure",
            HarvestState::Calculate => "calculate",
            HarvestState::Format => "format",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarvestContext {
    pub data: HarvestData,
    pub window: Option<MonthWindow>,
    pub entries: HourTotals,
    pub fields: FormSchema,
}

impl HarvestContext {
    pub fn seeded(data: HarvestData) -> Self {
        Self {
            data,
            fields: fields::harvest_schema(),
            ..Default::default()
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            account_id: self.data.account_id.clone(),
            token: self.data.token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    /// Start (re-)entering the provider settings.
    Edit,
    AccountId(String),
    Token(String),
    Contract(ContractType),
    FlatSalary(Decimal),
    HourlyRate(Decimal),
    Validated(HarvestUser),
    ValidationFailed(String),
    /// Answer to the retry prompt: `true` re-enters credentials.
    Retry(bool),
    Calculate(MonthWindow),
    EntriesFetched(Vec<TimeEntry>),
    FetchFailed(String),
}

fn filled(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl Machine for HarvestMachine {
    type State = HarvestState;
    type Context = HarvestContext;
    type Event = HarvestEvent;
    type Output = ProviderOutput;

    const NAME: &'static str = "harvest-provider";

    fn initial() -> HarvestState {
        HarvestState::Idle
    }

    fn on_event(state: HarvestState, mut ctx: HarvestContext, event: HarvestEvent) -> Step<Self> {
        use HarvestEvent as E;
        use HarvestState as S;

        match (state, event) {
            (S::Idle | S::Success | S::Failure, E::Edit) => Step::to(S::AccountId, ctx),
            (S::AccountId, E::AccountId(value)) => match filled(&value) {
                Some(value) => {
                    ctx.data.account_id = value;
                    Step::to(S::Token, ctx)
                }
                None => Step::stay(ctx),
            },
            (S::Token, E::Token(value)) => match filled(&value) {
                Some(value) => {
                    ctx.data.token = value;
                    Step::to(S::TypeOfContract, ctx)
                }
                None => Step::stay(ctx),
            },
            (S::TypeOfContract, E::Contract(contract)) => {
                ctx.data.set_contract(contract);
                match contract {
                    ContractType::FlatSalary => Step::to(S::FlatSalary, ctx),
                    ContractType::HourlyRate => Step::to(S::HourlyRate, ctx),
                }
            }
            (S::FlatSalary, E::FlatSalary(amount)) => {
                ctx.data.flat_salary = Some(amount);
                Step::to(S::Loading, ctx)
            }
            (S::HourlyRate, E::HourlyRate(amount)) => {
                ctx.data.hourly_rate = Some(amount);
                Step::to(S::Loading, ctx)
            }
            (S::Loading, E::Validated(user)) => {
                ctx.data.user = Some(user);
                ctx.data.last_validation_error = None;
                Step::to(S::Success, ctx)
            }
            (S::Loading, E::ValidationFailed(error)) => {
                ctx.data.last_validation_error = Some(error);
                Step::to(S::Retry, ctx)
            }
            (S::Retry, E::Retry(true)) => Step::to(S::AccountId, ctx),
            (S::Retry, E::Retry(false)) => Step::to(S::Failure, ctx),
            (S::Idle | S::Success, E::Calculate(window)) => {
                ctx.window = Some(window);
                Step::to(S::Calculate, ctx)
            }
            (S::Calculate, E::EntriesFetched(entries)) => {
                ctx.entries = match &ctx.window {
                    Some(window) => report::aggregate_hours(&entries, window),
                    None => HourTotals::new(),
                };
                Step::to(S::Format, ctx)
            }
            (S::Calculate, E::FetchFailed(error)) => {
                Step::to(S::Idle, ctx).emit(ProviderOutput::CalculateFailure(error))
            }
            _ => Step::stay(ctx),
        }
    }

    fn on_enter(state: HarvestState, mut ctx: HarvestContext) -> Step<Self> {
        match state {
            HarvestState::Idle if ctx.data.account_id.is_empty() => {
                Step::to(HarvestState::AccountId, ctx)
            }
            HarvestState::Loading => {
                let creds = ctx.credentials();
                Step::stay(ctx).emit(ProviderOutput::Request(ProviderRequest::ValidateCredentials(
                    creds,
                )))
            }
            HarvestState::Calculate => match ctx.window {
                Some(window) => {
                    let creds = ctx.credentials();
                    Step::stay(ctx).emit(ProviderOutput::Request(
                        ProviderRequest::FetchTimeEntries(creds, window),
                    ))
                }
                None => Step::to(HarvestState::Idle, ctx)
                    .emit(ProviderOutput::CalculateFailure("no month selected".into())),
            },
            HarvestState::Format => {
                let output = match report::hourly_report(&ctx.data, &ctx.entries) {
                    Ok(report) => ProviderOutput::CalculateSuccess(report),
                    Err(e) => ProviderOutput::CalculateFailure(e.to_string()),
                };
                ctx.entries.clear();
                ctx.window = None;
                Step::to(HarvestState::Idle, ctx).emit(output)
            }
            _ => Step::stay(ctx),
        }
    }
}
