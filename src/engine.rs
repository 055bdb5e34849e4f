//! Runs the effects the router hands out and feeds their results back.
//!
//! Effects are executed one at a time in the order they were produced, so
//! a workflow never sees two results interleaved.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::calendar::{self, MonthWindow};
use crate::config::AppConfig;
use crate::error::{DependencyError, SpreadsheetError};
use crate::harvest::{Credentials, HarvestClient, HarvestError, HarvestUser, TimeEntry};
use crate::router::{Effect, Router, RouterEvent};
use crate::spreadsheet;
use crate::workflow::harvest::HarvestEvent;
use crate::workflow::invoice::GenerateJob;
use crate::workflow::{ClientEvent, InvoiceEvent, InvoiceRequest, ProviderEvent, ProviderRequest};

/// The outside world as the workflows see it.
#[allow(async_fn_in_trait)]
pub trait Effects {
    fn today(&self) -> NaiveDate;

    async fn validate_credentials(&self, creds: &Credentials) -> Result<HarvestUser, HarvestError>;

    async fn time_entries(
        &self,
        creds: &Credentials,
        window: &MonthWindow,
    ) -> Result<Vec<TimeEntry>, HarvestError>;

    async fn check_dependencies(&self, required: &[&'static str]) -> Result<(), DependencyError>;

    async fn generate(&self, job: &GenerateJob) -> Result<Vec<PathBuf>, SpreadsheetError>;
}

/// Harvest over HTTP and the spreadsheet template on disk.
pub struct LiveEffects {
    harvest: HarvestClient,
    template_path: PathBuf,
    output_dir: PathBuf,
}

impl LiveEffects {
    pub fn new(config: &AppConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            harvest: HarvestClient::with_base_url(config.harvest_url.clone())?,
            template_path: config.template_path.clone(),
            output_dir: config.output_dir.clone(),
        })
    }
}

impl Effects for LiveEffects {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    async fn validate_credentials(&self, creds: &Credentials) -> Result<HarvestUser, HarvestError> {
        self.harvest.whoami(creds).await
    }

    async fn time_entries(
        &self,
        creds: &Credentials,
        window: &MonthWindow,
    ) -> Result<Vec<TimeEntry>, HarvestError> {
        self.harvest.time_entries(creds, window).await
    }

    async fn check_dependencies(&self, required: &[&'static str]) -> Result<(), DependencyError> {
        let path = self.template_path.clone();
        let required = required.to_vec();
        tokio::task::spawn_blocking(move || spreadsheet::check_dependencies(&path, &required))
            .await
            .map_err(|e| DependencyError::Unreadable(e.to_string()))?
    }

    async fn generate(&self, job: &GenerateJob) -> Result<Vec<PathBuf>, SpreadsheetError> {
        let template = self.template_path.clone();
        let output_dir = self.output_dir.clone();
        let job = job.clone();
        let written = tokio::task::spawn_blocking(move || {
            spreadsheet::render(&template, &output_dir, &job.filename, &job.variables)
        })
        .await
        .map_err(|e| SpreadsheetError::Write {
            path: self.output_dir.clone(),
            message: e.to_string(),
        })??;
        Ok(vec![written])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub max_prev_years: u32,
    pub cutoff_day: u32,
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_prev_years: config.max_prev_years,
            cutoff_day: config.recommend_cutoff_day,
        }
    }
}

pub struct Engine<E> {
    router: Router,
    effects: E,
    settings: Settings,
}

impl<E: Effects> Engine<E> {
    pub fn new(router: Router, effects: E, settings: Settings) -> Self {
        Self {
            router,
            effects,
            settings,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn start(&mut self) {
        let pending = self.router.start();
        self.drain(pending).await;
    }

    /// Delivers `event` and runs every effect it causes, including the
    /// effects caused by their results.
    pub async fn send(&mut self, event: RouterEvent) {
        let pending = self.router.handle(event);
        self.drain(pending).await;
    }

    async fn drain(&mut self, pending: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = pending.into();
        while let Some(effect) = queue.pop_front() {
            debug!(?effect, "running effect");
            let event = self.run(effect).await;
            queue.extend(self.router.handle(event));
        }
    }

    async fn run(&self, effect: Effect) -> RouterEvent {
        match effect {
            Effect::Provider { client, request } => {
                let event = match request {
                    ProviderRequest::ValidateCredentials(creds) => {
                        match self.effects.validate_credentials(&creds).await {
                            Ok(user) => HarvestEvent::Validated(user),
                            Err(e) => {
                                warn!(error = %e, "harvest credentials rejected");
                                HarvestEvent::ValidationFailed(e.to_string())
                            }
                        }
                    }
                    ProviderRequest::FetchTimeEntries(creds, window) => {
                        match self.effects.time_entries(&creds, &window).await {
                            Ok(entries) => HarvestEvent::EntriesFetched(entries),
                            Err(e) => {
                                warn!(error = %e, "fetching time entries failed");
                                HarvestEvent::FetchFailed(e.to_string())
                            }
                        }
                    }
                };
                RouterEvent::Client(client, ClientEvent::Provider(ProviderEvent::Harvest(event)))
            }
            Effect::Invoice { invoice, request } => {
                let event = match request {
                    InvoiceRequest::AvailableYears => {
                        let today = self.effects.today();
                        InvoiceEvent::AvailableYears(calendar::available_years(
                            today,
                            self.settings.max_prev_years,
                        ))
                    }
                    InvoiceRequest::RecommendedMonth => {
                        let today = self.effects.today();
                        let (year, month) =
                            calendar::recommended_month(today, self.settings.cutoff_day);
                        InvoiceEvent::RecommendedMonth { year, month }
                    }
                    InvoiceRequest::CheckDependencies(required) => {
                        match self.effects.check_dependencies(&required).await {
                            Ok(()) => InvoiceEvent::DependenciesOk,
                            Err(e) => InvoiceEvent::DependenciesMissing(e.to_string()),
                        }
                    }
                    InvoiceRequest::Generate(job) => match self.effects.generate(&job).await {
                        Ok(files) => InvoiceEvent::Generated(files),
                        Err(e) => {
                            warn!(error = %e, "invoice generation failed");
                            InvoiceEvent::GenerateFailed(e.to_string())
                        }
                    },
                };
                RouterEvent::Invoice(invoice, event)
            }
        }
    }
}
