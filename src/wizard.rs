//! Interactive prompts for every screen and workflow state.
//!
//! Each turn looks at the router's screen and active workflow, asks one
//! question and turns the answer into a router event. Escape discards the
//! active workflow (or goes back), Ctrl-C leaves the wizard.

use std::fmt;

use inquire::validator::Validation;
use inquire::{
    Confirm, CustomType, InquireError, MultiSelect, Password, PasswordDisplayMode, Select, Text,
};
use rust_decimal::Decimal;

use crate::engine::{Effects, Engine};
use crate::error::InvoicerError;
use crate::records::{ContractType, EntityId, ProviderData, ProviderKind};
use crate::report::ReportRow;
use crate::router::{CompletedAction, Router, RouterEvent, Screen};
use crate::ui::{Busy, Palette};
use crate::workflow::fields::FormSchema;
use crate::workflow::fixed_rate::{FixedRateEvent, FixedRateMachine, FixedRateState};
use crate::workflow::harvest::{HarvestEvent, HarvestMachine, HarvestState};
use crate::workflow::invoice::default_period;
use crate::workflow::{
    BaseInfoEvent, BaseInfoState, ClientEvent, ClientMachine, ClientState, InvoiceEvent,
    InvoiceMachine, InvoiceState, ProviderEvent, ProviderFlow, ProviderStatus, Workflow,
};

#[derive(Debug, Clone)]
enum Turn {
    Send {
        event: RouterEvent,
        /// Spinner message while the effects of `event` run.
        busy: Option<String>,
    },
    Quit,
}

impl Turn {
    fn send(event: RouterEvent) -> Self {
        Turn::Send { event, busy: None }
    }

    fn busy(event: RouterEvent, message: &str) -> Self {
        Turn::Send {
            event,
            busy: Some(message.to_string()),
        }
    }

    fn home() -> Self {
        Turn::send(RouterEvent::Navigate(Screen::Home))
    }
}

struct Choice<T> {
    label: String,
    value: T,
}

impl<T> Choice<T> {
    fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Runs the wizard until the user quits.
pub async fn run<E: Effects>(engine: &mut Engine<E>) -> Result<(), InvoicerError> {
    let palette = Palette::default();
    engine.start().await;
    loop {
        match next_turn(engine.router(), &palette)? {
            Turn::Quit => return Ok(()),
            Turn::Send { event, busy } => {
                let spinner = busy.as_deref().map(Busy::start);
                engine.send(event).await;
                if let Some(spinner) = spinner {
                    spinner.finish();
                }
            }
        }
    }
}

fn next_turn(router: &Router, palette: &Palette) -> Result<Turn, InvoicerError> {
    match router.screen() {
        Screen::Initializing => Ok(Turn::home()),
        Screen::Home => menu(router, "What do you want to do?", Turn::Quit),
        Screen::ManageClients => menu(router, "Manage clients", Turn::home()),
        Screen::BaseInfo => base_info_turn(router, palette),
        Screen::CreateClient | Screen::EditClient => match router.active_client() {
            Some(client) => client_turn(client, palette),
            None if router.screen() == Screen::EditClient => pick_client(router, palette),
            None => Ok(Turn::home()),
        },
        Screen::CreateInvoice => match router.active_invoice() {
            Some(invoice) => invoice_turn(invoice, palette),
            None => Ok(Turn::home()),
        },
        Screen::RemoveClient => remove_clients(router, palette),
        Screen::ActionCompleted => {
            completed(router, palette);
            Ok(Turn::home())
        }
    }
}

/// Escape becomes `on_cancel`, Ctrl-C quits, anything else is an error.
fn resolve(result: Result<Turn, InquireError>, on_cancel: Turn) -> Result<Turn, InvoicerError> {
    match result {
        Ok(turn) => Ok(turn),
        Err(InquireError::OperationCanceled) => Ok(on_cancel),
        Err(InquireError::OperationInterrupted) => Ok(Turn::Quit),
        Err(e) => Err(e.into()),
    }
}

fn select<T>(message: &str, choices: Vec<Choice<T>>, cursor: usize) -> Result<T, InquireError> {
    let cursor = cursor.min(choices.len().saturating_sub(1));
    Select::new(message, choices)
        .with_starting_cursor(cursor)
        .prompt()
        .map(|choice| choice.value)
}

/// Select over a yes/no schema field; the first option means yes.
fn yes_no(fields: &FormSchema, key: &str) -> Result<bool, InquireError> {
    let choices = fields
        .options(key)
        .iter()
        .enumerate()
        .map(|(i, option)| Choice::new(option.label.clone(), i == 0))
        .collect();
    select(fields.label(key), choices, 0)
}

fn text(message: &str, default: &str) -> Result<String, InquireError> {
    let mut prompt = Text::new(message);
    if !default.is_empty() {
        prompt = prompt.with_default(default);
    }
    prompt.prompt()
}

fn amount(message: &str, default: Option<Decimal>) -> Result<Decimal, InquireError> {
    let mut prompt = CustomType::<Decimal>::new(message)
        .with_error_message("Please type a valid amount")
        .with_validator(|value: &Decimal| {
            if *value > Decimal::ZERO {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid("The amount must be positive".into()))
            }
        });
    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }
    prompt.prompt()
}

fn menu(router: &Router, message: &str, on_cancel: Turn) -> Result<Turn, InvoicerError> {
    let mut choices: Vec<Choice<Option<Screen>>> = router
        .menu()
        .iter()
        .map(|item| Choice::new(item.label, Some(item.screen)))
        .collect();
    let cursor = router
        .navigated()
        .and_then(|screen| choices.iter().position(|c| c.value == Some(screen)))
        .unwrap_or(0);
    if router.screen() == Screen::Home {
        choices.push(Choice::new("Quit", None));
    }
    let result = select(message, choices, cursor).map(|target| match target {
        Some(screen) => Turn::send(RouterEvent::SelectMenu(screen)),
        None => Turn::Quit,
    });
    resolve(result, on_cancel)
}

fn base_info_turn(router: &Router, palette: &Palette) -> Result<Turn, InvoicerError> {
    let Some(flow) = router.base_info_flow() else {
        return Ok(Turn::home());
    };
    let ctx = flow.context();
    let send = |event| Turn::send(RouterEvent::BaseInfo(event));

    let result = match flow.state() {
        BaseInfoState::Firstname => text(ctx.fields.label("firstname"), &ctx.info.firstname)
            .map(|v| send(BaseInfoEvent::Firstname(v))),
        BaseInfoState::Lastname => text(ctx.fields.label("lastname"), &ctx.info.lastname)
            .map(|v| send(BaseInfoEvent::Lastname(v))),
        BaseInfoState::Review => {
            palette.heading(ctx.fields.label("review"));
            palette.details(ctx.fields.columns("review"), |key| match key {
                "firstname" => Some(ctx.info.firstname.clone()),
                "lastname" => Some(ctx.info.lastname.clone()),
                _ => None,
            });
            Confirm::new("Save?").with_default(true).prompt().map(|yes| {
                send(if yes {
                    BaseInfoEvent::Confirm
                } else {
                    BaseInfoEvent::Discard
                })
            })
        }
        BaseInfoState::Success => Ok(Turn::home()),
    };
    resolve(result, send(BaseInfoEvent::Discard))
}

fn pick_client(router: &Router, palette: &Palette) -> Result<Turn, InvoicerError> {
    let choices: Vec<Choice<EntityId>> = router
        .committed_clients()
        .map(|c| Choice::new(c.to_string(), c.id.clone()))
        .collect();
    if choices.is_empty() {
        palette.warning("There are no clients to edit");
        return Ok(Turn::home());
    }
    let result = select("Pick a client to edit", choices, 0)
        .map(|id| Turn::send(RouterEvent::EditClient(id)));
    resolve(result, Turn::home())
}

fn remove_clients(router: &Router, palette: &Palette) -> Result<Turn, InvoicerError> {
    let choices: Vec<Choice<EntityId>> = router
        .committed_clients()
        .map(|c| Choice::new(c.to_string(), c.id.clone()))
        .collect();
    if choices.is_empty() {
        palette.warning("There are no clients to remove");
        return Ok(Turn::home());
    }
    let result = MultiSelect::new("Select the clients to remove", choices)
        .prompt()
        .map(|picked| {
            let ids = picked.into_iter().map(|c| c.value).collect();
            Turn::send(RouterEvent::RemoveClients(ids))
        });
    resolve(result, Turn::home())
}

fn completed(router: &Router, palette: &Palette) {
    match router.last_completed() {
        Some(CompletedAction::Client) => palette.success("Client saved"),
        Some(CompletedAction::Invoice(id)) => {
            palette.success("Invoice generated");
            if let Some(record) = router.committed_invoice(id) {
                for file in &record.files {
                    println!("    {}", file.display());
                }
            }
        }
        Some(CompletedAction::ClientsRemoved(count)) => {
            palette.success(&format!("Removed {count} client(s)"))
        }
        None => {}
    }
}

fn client_turn(
    client: &Workflow<ClientMachine>,
    palette: &Palette,
) -> Result<Turn, InvoicerError> {
    let id = client.id();
    let ctx = client.context();
    let fields = &ctx.record.fields;
    let send = |event| RouterEvent::Client(id.clone(), event);
    let discard = Turn::send(send(ClientEvent::Discard));

    let result = match client.state() {
        ClientState::Name => text(fields.label("name"), &ctx.record.name)
            .map(|name| Turn::send(send(ClientEvent::Name(name)))),
        ClientState::Provider => {
            let choices: Vec<Choice<ProviderKind>> = fields
                .options("provider")
                .iter()
                .filter_map(|o| {
                    ProviderKind::from_value(&o.value).map(|k| Choice::new(o.label.clone(), k))
                })
                .collect();
            let cursor = ctx
                .record
                .provider_kind
                .and_then(|kind| choices.iter().position(|c| c.value == kind))
                .unwrap_or(0);
            select(fields.label("provider"), choices, cursor)
                .map(|kind| Turn::send(send(ClientEvent::ChooseProvider(kind))))
        }
        ClientState::Harvest | ClientState::FixedRate => match &ctx.provider {
            Some(ProviderFlow::Harvest(flow)) => {
                harvest_prompt(flow, palette).map(|answer| match answer {
                    Some((event, busy)) => Turn::Send {
                        event: send(ClientEvent::Provider(ProviderEvent::Harvest(event))),
                        busy,
                    },
                    None => discard.clone(),
                })
            }
            Some(ProviderFlow::FixedRate(flow)) => {
                fixed_rate_prompt(flow).map(|answer| match answer {
                    Some(event) => {
                        Turn::send(send(ClientEvent::Provider(ProviderEvent::FixedRate(event))))
                    }
                    None => discard.clone(),
                })
            }
            None => Ok(discard.clone()),
        },
        ClientState::Review => {
            print_client_review(client, palette);
            let confirmed = ctx.provider_status == Some(ProviderStatus::Confirmed);
            let save = if confirmed { "Save client" } else { "Discard client" };
            let choices = vec![
                Choice::new(save, ClientEvent::Confirm),
                Choice::new("Start over", ClientEvent::Back),
            ];
            select("What now?", choices, 0).map(|event| Turn::send(send(event)))
        }
        // no input is expected in the remaining states
        ClientState::Initializing | ClientState::ProviderFork | ClientState::Complete => {
            Ok(discard.clone())
        }
    };
    resolve(result, discard)
}

fn print_client_review(client: &Workflow<ClientMachine>, palette: &Palette) {
    let ctx = client.context();
    let record = &ctx.record;
    let harvest = match record.providers.get(&ProviderKind::Harvest) {
        Some(ProviderData::Harvest(data)) => Some(data),
        _ => None,
    };
    let fixed = match record.providers.get(&ProviderKind::FixedRate) {
        Some(ProviderData::FixedRate(data)) => Some(data),
        _ => None,
    };

    palette.heading(record.fields.label("review"));
    palette.details(record.fields.columns("review"), |key| match key {
        "name" => Some(record.name.clone()),
        "provider" => record.provider_kind.map(|k| k.to_string()),
        "typeOfContract" => harvest.and_then(|h| h.contract_type).map(|c| c.to_string()),
        "flatSalary" => harvest.and_then(|h| h.flat_salary).map(|v| v.to_string()),
        "hourlyRate" => harvest.and_then(|h| h.hourly_rate).map(|v| v.to_string()),
        "fixedRate" => fixed.map(|f| f.rate.clone()),
        "fixedRateDescription" => fixed.map(|f| f.description.clone()),
        "harvest" => harvest.map(|_| match ctx.provider_status {
            Some(ProviderStatus::Confirmed) => "Valid credentials".to_string(),
            _ => "Invalid credentials".to_string(),
        }),
        _ => None,
    });
}

fn harvest_prompt(
    flow: &Workflow<HarvestMachine>,
    palette: &Palette,
) -> Result<Option<(HarvestEvent, Option<String>)>, InquireError> {
    let ctx = flow.context();
    let fields = &ctx.fields;
    let loading = Some(fields.label("loading").to_string());

    let answer = match flow.state() {
        HarvestState::AccountId => {
            let account_id = text(fields.label("accountId"), &ctx.data.account_id)?;
            (HarvestEvent::AccountId(account_id), None)
        }
        HarvestState::Token => {
            let token = Password::new(fields.label("token"))
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked)
                .with_help_message("Leave empty to keep the current token")
                .prompt()?;
            let token = if token.trim().is_empty() {
                ctx.data.token.clone()
            } else {
                token
            };
            (HarvestEvent::Token(token), None)
        }
        HarvestState::TypeOfContract => {
            let choices: Vec<Choice<ContractType>> = fields
                .options("typeOfContract")
                .iter()
                .filter_map(|o| {
                    ContractType::from_value(&o.value).map(|c| Choice::new(o.label.clone(), c))
                })
                .collect();
            let cursor = ctx
                .data
                .contract_type
                .and_then(|kind| choices.iter().position(|c| c.value == kind))
                .unwrap_or(0);
            let contract = select(fields.label("typeOfContract"), choices, cursor)?;
            (HarvestEvent::Contract(contract), None)
        }
        HarvestState::FlatSalary => (
            HarvestEvent::FlatSalary(amount(fields.label("flat_salary"), ctx.data.flat_salary)?),
            loading,
        ),
        HarvestState::HourlyRate => (
            HarvestEvent::HourlyRate(amount(fields.label("hourly_rate"), ctx.data.hourly_rate)?),
            loading,
        ),
        HarvestState::Retry => {
            if let Some(error) = &ctx.data.last_validation_error {
                palette.failure(error);
            }
            (HarvestEvent::Retry(yes_no(fields, "retry")?), None)
        }
        HarvestState::Idle
        | HarvestState::Loading
        | HarvestState::Success
        | HarvestState::Failure
        | HarvestState::Calculate
        | HarvestState::Format => return Ok(None),
    };
    Ok(Some(answer))
}

fn fixed_rate_prompt(
    flow: &Workflow<FixedRateMachine>,
) -> Result<Option<FixedRateEvent>, InquireError> {
    let ctx = flow.context();
    let fields = &ctx.fields;
    let event = match flow.state() {
        FixedRateState::Rate => {
            let mut prompt = Text::new(fields.label("rate")).with_validator(|value: &str| {
                match value.trim().parse::<Decimal>() {
                    Ok(_) => Ok(Validation::Valid),
                    Err(_) => Ok(Validation::Invalid("Please type a valid amount".into())),
                }
            });
            if !ctx.data.rate.is_empty() {
                prompt = prompt.with_default(&ctx.data.rate);
            }
            FixedRateEvent::Rate(prompt.prompt()?)
        }
        FixedRateState::Description => {
            FixedRateEvent::Description(text(fields.label("description"), &ctx.data.description)?)
        }
        FixedRateState::Idle | FixedRateState::Success | FixedRateState::Format => return Ok(None),
    };
    Ok(Some(event))
}

fn invoice_turn(
    invoice: &Workflow<InvoiceMachine>,
    palette: &Palette,
) -> Result<Turn, InvoicerError> {
    let id = invoice.id();
    let ctx = invoice.context();
    let fields = &ctx.fields;
    let send = |event| RouterEvent::Invoice(id.clone(), event);
    let discard = Turn::send(send(InvoiceEvent::Discard));
    let retry = |key: &str, busy: Option<&str>| {
        yes_no(fields, key).map(|again| match (again, busy) {
            (true, Some(message)) => Turn::busy(send(InvoiceEvent::Retry(true)), message),
            _ => Turn::send(send(InvoiceEvent::Retry(again))),
        })
    };

    let result = match invoice.state() {
        InvoiceState::Client => {
            let choices: Vec<Choice<EntityId>> = ctx
                .clients
                .iter()
                .map(|c| Choice::new(c.name.clone(), c.id.clone()))
                .collect();
            select(fields.label("client"), choices, 0)
                .map(|id| Turn::send(send(InvoiceEvent::SelectClient(id))))
        }
        InvoiceState::Payment => {
            let choices: Vec<Choice<String>> = fields
                .options("payment")
                .iter()
                .map(|o| Choice::new(o.label.clone(), o.value.clone()))
                .collect();
            select(fields.label("payment"), choices, 0)
                .map(|value| Turn::send(send(InvoiceEvent::Payment(value))))
        }
        InvoiceState::Year => {
            if ctx.available_years.is_empty() {
                palette.failure("No years are available to invoice");
                return Ok(discard);
            }
            let choices: Vec<Choice<i32>> = ctx
                .available_years
                .iter()
                .map(|&y| Choice::new(y.to_string(), y))
                .collect();
            let cursor = default_period(ctx)
                .and_then(|(year, _)| ctx.available_years.iter().position(|&y| y == year))
                .unwrap_or(0);
            select(fields.label("year"), choices, cursor)
                .map(|year| Turn::send(send(InvoiceEvent::Year(year))))
        }
        InvoiceState::Month => {
            let choices: Vec<Choice<u32>> = fields
                .options("month")
                .iter()
                .filter_map(|o| o.value.parse().ok().map(|m| Choice::new(o.label.clone(), m)))
                .collect();
            let cursor = default_period(ctx).map(|(_, month)| month as usize - 1).unwrap_or(0);
            select(fields.label("month"), choices, cursor)
                .map(|month| {
                    Turn::busy(send(InvoiceEvent::Month(month)), fields.label("calculating"))
                })
        }
        InvoiceState::RetryMonth => retry("retry_month", None),
        InvoiceState::RetryCalculating => {
            if let Some(error) = &ctx.calculate_error {
                palette.failure(error);
            }
            retry("retry_calculating", Some(fields.label("calculating")))
        }
        InvoiceState::Review => {
            print_invoice_review(invoice, palette);
            Confirm::new("Generate the invoice?")
                .with_default(true)
                .prompt()
                .map(|yes| {
                    if yes {
                        Turn::busy(send(InvoiceEvent::Confirm), fields.label("generate"))
                    } else {
                        discard.clone()
                    }
                })
        }
        InvoiceState::RetryCheckDependencies => {
            if let Some(error) = &ctx.dependencies_error {
                palette.failure(error);
            }
            retry("retry_check_dependencies", Some(fields.label("check_dependencies")))
        }
        InvoiceState::RetryGenerate => retry("retry_generate", Some(fields.label("generate"))),
        // no input is expected in the remaining states
        InvoiceState::Calculating
        | InvoiceState::Format
        | InvoiceState::CheckDependencies
        | InvoiceState::Generate
        | InvoiceState::Success
        | InvoiceState::Failure => Ok(discard.clone()),
    };
    resolve(result, discard)
}

fn print_invoice_review(invoice: &Workflow<InvoiceMachine>, palette: &Palette) {
    let ctx = invoice.context();
    palette.heading(ctx.fields.label("review"));
    palette.details(ctx.fields.columns("review"), |key| match key {
        "name" => Some(ctx.name.clone()),
        "provider" => ctx.provider_kind.map(|k| k.to_string()),
        other => ctx
            .formatted
            .as_ref()
            .and_then(|vars| vars.get(other))
            .filter(|v| !v.is_absent())
            .map(|v| v.display()),
    });

    if let Some(report) = &ctx.calculated {
        println!();
        let rows: Vec<Vec<String>> = report
            .report
            .iter()
            .map(|row| {
                let optional =
                    |v: Option<Decimal>| v.map(|d| d.round_dp(2).to_string()).unwrap_or_default();
                vec![
                    row.project_name.clone(),
                    optional(row.hourly_rate),
                    optional(row.hours),
                    row.amount.to_string(),
                ]
            })
            .collect();
        palette.table(&ReportRow::COLUMNS, &rows);
    }
}
