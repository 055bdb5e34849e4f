//! Committed entity records and the identifiers that key them.
//!
//! Records are plain data: they never hold workflow handles, and the
//! transient form schema is skipped by serde so only committed field values
//! reach the store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::harvest::HarvestUser;
use crate::report::CalculatedReport;
use crate::workflow::fields::{self, FormSchema};
use crate::workflow::invoice::InvoiceContext;

/// Stable entity identifier, generated once per draft and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two kinds of entity the router commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Client,
    Invoice,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Client => write!(f, "client"),
            EntityKind::Invoice => write!(f, "invoice"),
        }
    }
}

/// Personal details printed on every invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseInfo {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

impl BaseInfo {
    pub fn is_complete(&self) -> bool {
        !self.firstname.trim().is_empty() && !self.lastname.trim().is_empty()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Time-tracking integration attached to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Harvest,
    FixedRate,
}

impl ProviderKind {
    /// Parses the value used by the provider select field.
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "harvest" => Some(ProviderKind::Harvest),
            "fixed_rate" => Some(ProviderKind::FixedRate),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Harvest => write!(f, "Harvest"),
            ProviderKind::FixedRate => write!(f, "Fixed"),
        }
    }
}

/// Billing arrangement for remote-hours clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    FlatSalary,
    HourlyRate,
}

impl ContractType {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "flat_salary" => Some(ContractType::FlatSalary),
            "hourly_rate" => Some(ContractType::HourlyRate),
            _ => None,
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractType::FlatSalary => write!(f, "Flat Salary"),
            ContractType::HourlyRate => write!(f, "Hourly Rate"),
        }
    }
}

/// Remote-hours provider settings.
///
/// Only one of `flat_salary` / `hourly_rate` is meaningful, picked by
/// `contract_type`; [`HarvestData::set_contract`] clears the other one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestData {
    pub account_id: String,
    pub token: String,
    #[serde(default, rename = "typeOfContract")]
    pub contract_type: Option<ContractType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_salary: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<HarvestUser>,
}

impl HarvestData {
    pub fn set_contract(&mut self, contract: ContractType) {
        self.contract_type = Some(contract);
        match contract {
            ContractType::FlatSalary => self.hourly_rate = None,
            ContractType::HourlyRate => self.flat_salary = None,
        }
    }
}

/// Fixed-rate provider settings. The rate is kept as typed and parsed when a
/// report is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRateData {
    pub rate: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderData {
    Harvest(HarvestData),
    FixedRate(FixedRateData),
}

impl ProviderData {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderData::Harvest(_) => ProviderKind::Harvest,
            ProviderData::FixedRate(_) => ProviderKind::FixedRate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: EntityId,
    pub name: String,
    #[serde(default, rename = "provider")]
    pub provider_kind: Option<ProviderKind>,
    #[serde(default)]
    pub providers: BTreeMap<ProviderKind, ProviderData>,
    #[serde(skip)]
    pub fields: FormSchema,
}

impl ClientRecord {
    /// Factory shared by drafts and commits: restores the form schema and
    /// drops provider entries that do not match the chosen kind.
    pub fn create(seed: ClientRecord) -> Self {
        let ClientRecord {
            id,
            name,
            provider_kind,
            mut providers,
            ..
        } = seed;
        if let Some(kind) = provider_kind {
            providers.retain(|k, data| *k == kind && data.kind() == kind);
        }
        Self {
            id,
            name,
            provider_kind,
            providers,
            fields: fields::client_schema(),
        }
    }

    pub fn empty() -> Self {
        Self::create(Self::default())
    }

    /// Provider data for the chosen kind, if populated.
    pub fn active_provider(&self) -> Option<&ProviderData> {
        self.provider_kind.and_then(|kind| self.providers.get(&kind))
    }
}

impl fmt::Display for ClientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider_kind {
            Some(kind) => write!(f, "{} ({kind})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: EntityId,
    pub client_id: EntityId,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    pub payment_method: String,
    pub year: i32,
    pub month: u32,
    pub computed_report: CalculatedReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies_error: Option<String>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl InvoiceRecord {
    /// Re-derives a record from a finished invoice workflow context.
    /// Returns `None` when the context never reached a calculated report.
    pub fn create(ctx: &InvoiceContext) -> Option<Self> {
        Some(Self {
            id: ctx.id.clone(),
            client_id: ctx.client_id.clone()?,
            client_name: ctx.name.clone(),
            provider: ctx.provider_kind,
            payment_method: ctx.payment.clone(),
            year: ctx.year?,
            month: ctx.month?,
            computed_report: ctx.calculated.clone()?,
            dependencies_error: ctx.dependencies_error.clone(),
            files: ctx.output_files.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn harvest() -> ProviderData {
        ProviderData::Harvest(HarvestData {
            account_id: "123".into(),
            token: "secret".into(),
            contract_type: Some(ContractType::HourlyRate),
            hourly_rate: Some(dec!(45)),
            ..Default::default()
        })
    }

    #[test]
    fn entity_ids_are_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn base_info_completeness() {
        assert!(!BaseInfo::default().is_complete());
        let partial = BaseInfo {
            firstname: "Ada".into(),
            lastname: "  ".into(),
        };
        assert!(!partial.is_complete());
        let full = BaseInfo {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
        };
        assert!(full.is_complete());
        assert_eq!(full.full_name(), "Ada Lovelace");
    }

    #[test]
    fn set_contract_clears_the_other_amount() {
        let mut data = HarvestData {
            flat_salary: Some(dec!(3000)),
            hourly_rate: Some(dec!(20)),
            ..Default::default()
        };
        data.set_contract(ContractType::FlatSalary);
        assert_eq!(data.flat_salary, Some(dec!(3000)));
        assert_eq!(data.hourly_rate, None);

        data.set_contract(ContractType::HourlyRate);
        assert_eq!(data.flat_salary, None);
    }

    #[test]
    fn create_keeps_only_the_chosen_provider() {
        let mut providers = BTreeMap::new();
        providers.insert(ProviderKind::Harvest, harvest());
        providers.insert(
            ProviderKind::FixedRate,
            ProviderData::FixedRate(FixedRateData {
                rate: "100".into(),
                description: "Retainer".into(),
            }),
        );
        let record = ClientRecord::create(ClientRecord {
            id: "c1".into(),
            name: "Acme".into(),
            provider_kind: Some(ProviderKind::Harvest),
            providers,
            fields: FormSchema::default(),
        });

        assert_eq!(record.providers.len(), 1);
        assert_eq!(record.active_provider().map(|p| p.kind()), Some(ProviderKind::Harvest));
        assert!(record.fields.get("name").is_some());
    }

    #[test]
    fn client_record_skips_fields_when_serialized() {
        let record = ClientRecord::empty();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("fields").is_none());
        assert!(json.get("provider").is_some());
    }

    #[test]
    fn provider_data_untagged_roundtrip() {
        let mut providers = BTreeMap::new();
        providers.insert(ProviderKind::Harvest, harvest());
        let json = serde_json::to_string(&providers).unwrap();
        assert!(json.contains(r#""harvest""#));
        assert!(json.contains(r#""accountId":"123""#));

        let back: BTreeMap<ProviderKind, ProviderData> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, providers);

        let fixed: ProviderData =
            serde_json::from_str(r#"{"rate":"250.50","description":"Support"}"#).unwrap();
        assert_eq!(fixed.kind(), ProviderKind::FixedRate);
    }

    #[test]
    fn select_values_parse() {
        assert_eq!(ProviderKind::from_value("harvest"), Some(ProviderKind::Harvest));
        assert_eq!(ProviderKind::from_value("fixed_rate"), Some(ProviderKind::FixedRate));
        assert_eq!(ProviderKind::from_value("other"), None);
        assert_eq!(ContractType::from_value("flat_salary"), Some(ContractType::FlatSalary));
    }
}
