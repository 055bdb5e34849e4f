//! Wire types for the Harvest v2 endpoints used by the remote-hours provider.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account id and personal access token captured by the provider form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Response of `GET /v2/users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestUser {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

/// One page of `GET /v2/time_entries`.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeEntriesPage {
    pub time_entries: Vec<TimeEntry>,
    #[serde(default)]
    pub links: Option<Links>,
}

impl TimeEntriesPage {
    pub fn next_url(&self) -> Option<&str> {
        self.links.as_ref().and_then(|l| l.next.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeEntry {
    pub hours: Decimal,
    pub spent_date: NaiveDate,
    pub client: EntryClient,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryClient {
    pub name: String,
}
