//! Invoice creation: period and client selection, calculation through the
//! client's provider, template checks and document generation.

use std::fmt;
use std::path::PathBuf;

use super::fields::{self, FieldOption, FormSchema};
use super::machine::{Machine, Step, Workflow};
use crate::calendar::MonthWindow;
use crate::records::{BaseInfo, ClientRecord, EntityId, ProviderKind};
use crate::report::CalculatedReport;
use crate::spreadsheet::{self, SUPPORTED_VARIABLES, TemplateValue, TemplateVariables};

pub struct InvoiceMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceState {
    Client,
    Payment,
    Year,
    Month,
    RetryMonth,
    Calculating,
    Format,
    RetryCalculating,
    Review,
    CheckDependencies,
    RetryCheckDependencies,
    Generate,
    RetryGenerate,
    Success,
    Failure,
}

impl InvoiceState {
    pub fn is_final(&self) -> bool {
        matches!(self, InvoiceState::Success | InvoiceState::Failure)
    }
}

impl fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceState::Client => "client",
            InvoiceState::Payment => "payment",
            InvoiceState::Year => "year",
            InvoiceState::Month => "month",
            InvoiceState::RetryMonth => "retry_month",
            InvoiceState::Calculating => "calculating",
            InvoiceState::Format => "format",
            InvoiceState::RetryCalculating => "retry_calculating",
            InvoiceState::Review => "review",
            InvoiceState::CheckDependencies => "check_dependencies",
            InvoiceState::RetryCheckDependencies => "retry_check_dependencies",
            InvoiceState::Generate => "generate",
            InvoiceState::RetryGenerate => "retry_generate",
            InvoiceState::Success => "success",
            InvoiceState::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// Non-owning handle to the provider that calculates for this invoice.
/// Resolved by the router through the owning client's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRef(pub EntityId);

/// Read-only summary of a committed client offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientChoice {
    pub id: EntityId,
    pub name: String,
    pub provider_kind: Option<ProviderKind>,
}

impl From<&ClientRecord> for ClientChoice {
    fn from(record: &ClientRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            provider_kind: record.provider_kind,
        }
    }
}

/// Everything the document writer needs for one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateJob {
    pub filename: String,
    pub variables: TemplateVariables,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceContext {
    pub id: EntityId,
    pub base_info: BaseInfo,
    pub clients: Vec<ClientChoice>,
    pub client_id: Option<EntityId>,
    pub provider: Option<ProviderRef>,
    pub name: String,
    pub provider_kind: Option<ProviderKind>,
    pub payment: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub available_years: Vec<i32>,
    pub recommended: Option<(i32, u32)>,
    pub calculated: Option<CalculatedReport>,
    pub formatted: Option<TemplateVariables>,
    pub calculate_error: Option<String>,
    pub dependencies_error: Option<String>,
    pub output_files: Vec<PathBuf>,
    pub fields: FormSchema,
}

impl InvoiceContext {
    pub fn new(id: EntityId, base_info: BaseInfo, clients: Vec<ClientChoice>) -> Self {
        let mut fields = fields::invoice_schema();
        fields.set_options(
            "client",
            clients
                .iter()
                .map(|c| FieldOption::new(c.name.clone(), c.id.to_string()))
                .collect(),
        );
        Self {
            id,
            base_info,
            clients,
            fields,
            ..Default::default()
        }
    }

    pub fn window(&self) -> Option<MonthWindow> {
        MonthWindow::new(self.year?, self.month?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceEvent {
    SelectClient(EntityId),
    Payment(String),
    Year(i32),
    Month(u32),
    AvailableYears(Vec<i32>),
    RecommendedMonth { year: i32, month: u32 },
    CalculateSuccess(CalculatedReport),
    CalculateFailure(String),
    Confirm,
    /// Answer to a retry prompt: `true` goes back to the failed step.
    Retry(bool),
    DependenciesOk,
    DependenciesMissing(String),
    Generated(Vec<PathBuf>),
    GenerateFailed(String),
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceRequest {
    AvailableYears,
    RecommendedMonth,
    CheckDependencies(Vec<&'static str>),
    Generate(GenerateJob),
}

#[derive(Debug, Clone)]
pub enum InvoiceOutput {
    Request(InvoiceRequest),
    /// Ask the referenced provider to calculate `window`.
    Calculate { provider: ProviderRef, window: MonthWindow },
    Commit(Box<InvoiceContext>),
    Discard,
}

/// Builds the template variables for review and generation.
///
/// Every supported variable starts out absent so unused placeholders get
/// cleared; computed values are laid over them.
pub fn format_invoice(ctx: &InvoiceContext) -> Result<TemplateVariables, String> {
    let calculated = ctx.calculated.as_ref().ok_or("nothing was calculated")?;
    let window = ctx.window().ok_or("no valid month selected")?;
    let payment_label = ctx
        .fields
        .option_label("payment", &ctx.payment)
        .ok_or_else(|| format!("unknown payment method '{}'", ctx.payment))?;

    let mut vars: TemplateVariables = SUPPORTED_VARIABLES
        .iter()
        .map(|v| (v.name.to_string(), TemplateValue::Absent))
        .collect();

    vars.insert("report".into(), TemplateValue::Report(calculated.report.clone()));
    let optional = [
        ("totalHours", calculated.total_hours),
        ("hourlyRate", calculated.hourly_rate),
        ("flatSalary", calculated.flat_salary),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            vars.insert(name.into(), TemplateValue::Number(value));
        }
    }
    vars.insert("payment_method".into(), TemplateValue::Text(payment_label.to_string()));
    vars.insert("month".into(), TemplateValue::Text(window.month_name().to_string()));
    vars.insert("year".into(), TemplateValue::Text(window.year().to_string()));
    Ok(vars)
}

/// Output filename plus the variables in the shape the writer expects.
pub fn generate_job(ctx: &InvoiceContext, formatted: &TemplateVariables) -> GenerateJob {
    let month = formatted
        .get("month")
        .map(TemplateValue::display)
        .unwrap_or_default();
    let filename = format!(
        "invoice-{month}-{}-{}",
        ctx.base_info.firstname, ctx.base_info.lastname
    )
    .to_uppercase();

    let mut variables = formatted.clone();
    if let Some(TemplateValue::Report(rows)) = variables.get("report") {
        let rows = spreadsheet::report_rows(rows);
        variables.insert("report".into(), TemplateValue::Rows(rows));
    }
    variables.insert("fullName".into(), TemplateValue::Text(ctx.base_info.full_name()));

    GenerateJob { filename, variables }
}

impl Machine for InvoiceMachine {
    type State = InvoiceState;
    type Context = InvoiceContext;
    type Event = InvoiceEvent;
    type Output = InvoiceOutput;

    const NAME: &'static str = "invoice";

    fn initial() -> InvoiceState {
        InvoiceState::Client
    }

    fn on_event(state: InvoiceState, mut ctx: InvoiceContext, event: InvoiceEvent) -> Step<Self> {
        use InvoiceEvent as E;
        use InvoiceState as S;

        if state.is_final() {
            return Step::stay(ctx);
        }

        match (state, event) {
            (_, E::Discard) => Step::stay(ctx).emit(InvoiceOutput::Discard),

            (S::Client, E::SelectClient(id)) => {
                let Some(choice) = ctx.clients.iter().find(|c| c.id == id).cloned() else {
                    return Step::stay(ctx);
                };
                ctx.provider = Some(ProviderRef(choice.id.clone()));
                ctx.client_id = Some(choice.id);
                ctx.name = choice.name;
                ctx.provider_kind = choice.provider_kind;
                Step::to(S::Payment, ctx)
            }
            (S::Payment, E::Payment(value)) => {
                if ctx.fields.option_label("payment", &value).is_none() {
                    return Step::stay(ctx);
                }
                ctx.payment = value;
                Step::to(S::Year, ctx)
            }

            (S::Year | S::Month, E::AvailableYears(years)) => {
                ctx.fields.set_options(
                    "year",
                    years
                        .iter()
                        .map(|y| FieldOption::new(y.to_string(), y.to_string()))
                        .collect(),
                );
                ctx.available_years = years;
                Step::stay(ctx)
            }
            (S::Year | S::Month, E::RecommendedMonth { year, month }) => {
                ctx.recommended = Some((year, month));
                Step::stay(ctx)
            }
            (S::Year, E::Year(year)) => {
                ctx.year = Some(year);
                Step::to(S::Month, ctx)
            }
            (S::Month, E::Month(month)) if (1..=12).contains(&month) => {
                ctx.month = Some(month);
                Step::to(S::Calculating, ctx)
            }

            (S::Calculating, E::CalculateSuccess(report)) => {
                if report.has_entries() {
                    ctx.calculated = Some(report);
                    ctx.calculate_error = None;
                    Step::to(S::Format, ctx)
                } else {
                    Step::to(S::RetryMonth, ctx)
                }
            }
            (S::Calculating, E::CalculateFailure(error)) => {
                ctx.calculate_error = Some(error);
                Step::to(S::RetryCalculating, ctx)
            }

            (S::Review, E::Confirm) => Step::to(S::CheckDependencies, ctx),

            (S::CheckDependencies, E::DependenciesOk) => {
                ctx.dependencies_error = None;
                Step::to(S::Generate, ctx)
            }
            (S::CheckDependencies, E::DependenciesMissing(error)) => {
                ctx.dependencies_error = Some(error);
                Step::to(S::RetryCheckDependencies, ctx)
            }

            (S::Generate, E::Generated(files)) => {
                ctx.output_files = files;
                let payload = Box::new(ctx.clone());
                Step::to(S::Success, ctx).emit(InvoiceOutput::Commit(payload))
            }
            (S::Generate, E::GenerateFailed(_)) => Step::to(S::RetryGenerate, ctx),

            (S::RetryMonth, E::Retry(true)) => Step::to(S::Month, ctx),
            (S::RetryCalculating, E::Retry(true)) => Step::to(S::Calculating, ctx),
            (S::RetryCheckDependencies, E::Retry(true)) => Step::to(S::CheckDependencies, ctx),
            (S::RetryGenerate, E::Retry(true)) => Step::to(S::Generate, ctx),
            (
                S::RetryMonth | S::RetryCalculating | S::RetryCheckDependencies | S::RetryGenerate,
                E::Retry(false),
            ) => Step::to(S::Failure, ctx).emit(InvoiceOutput::Discard),

            _ => Step::stay(ctx),
        }
    }

    fn on_enter(state: InvoiceState, mut ctx: InvoiceContext) -> Step<Self> {
        match state {
            InvoiceState::Year => {
                Step::stay(ctx).emit(InvoiceOutput::Request(InvoiceRequest::AvailableYears))
            }
            InvoiceState::Month => {
                Step::stay(ctx).emit(InvoiceOutput::Request(InvoiceRequest::RecommendedMonth))
            }
            InvoiceState::Calculating => match (ctx.provider.clone(), ctx.window()) {
                (Some(provider), Some(window)) => {
                    Step::stay(ctx).emit(InvoiceOutput::Calculate { provider, window })
                }
                _ => {
                    ctx.calculate_error = Some("no client or month selected".into());
                    Step::to(InvoiceState::RetryCalculating, ctx)
                }
            },
            InvoiceState::Format => match format_invoice(&ctx) {
                Ok(vars) => {
                    ctx.formatted = Some(vars);
                    Step::to(InvoiceState::Review, ctx)
                }
                Err(error) => {
                    ctx.calculate_error = Some(error);
                    Step::to(InvoiceState::RetryCalculating, ctx)
                }
            },
            InvoiceState::CheckDependencies => Step::stay(ctx).emit(InvoiceOutput::Request(
                InvoiceRequest::CheckDependencies(spreadsheet::required_variables()),
            )),
            InvoiceState::Generate => {
                let job = ctx.formatted.as_ref().map(|f| generate_job(&ctx, f));
                match job {
                    Some(job) => {
                        Step::stay(ctx).emit(InvoiceOutput::Request(InvoiceRequest::Generate(job)))
                    }
                    None => Step::to(InvoiceState::RetryGenerate, ctx),
                }
            }
            _ => Step::stay(ctx),
        }
    }
}

pub fn spawn_invoice(ctx: InvoiceContext) -> (Workflow<InvoiceMachine>, Vec<InvoiceOutput>) {
    Workflow::spawn(ctx.id.clone(), ctx)
}

/// Default year and month offered by the wizard.
pub fn default_period(ctx: &InvoiceContext) -> Option<(i32, u32)> {
    ctx.recommended
        .or_else(|| ctx.available_years.first().map(|&y| (y, 1)))
}
