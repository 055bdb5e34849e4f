//! Hour aggregation and invoice report rows.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::calendar::MonthWindow;
use crate::error::ReportError;
use crate::harvest::TimeEntry;
use crate::records::{ContractType, FixedRateData, HarvestData};

/// Hours tracked per client name, after rounding.
pub type HourTotals = BTreeMap<String, Decimal>;

/// One line of the invoice table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub project_name: String,
    pub hourly_rate: Option<Decimal>,
    pub hours: Option<Decimal>,
    pub amount: Decimal,
}

impl ReportRow {
    /// Column headers in the order cells are written.
    pub const COLUMNS: [&'static str; 4] = ["Project Name", "Hourly Rate", "Hours", "Amount US$"];
}

/// A provider's answer to a calculate request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedReport {
    pub report: Vec<ReportRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_salary: Option<Decimal>,
    /// Only present for flat-salary contracts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<Decimal>,
}

impl CalculatedReport {
    /// A report is usable when it has rows or positive tracked hours.
    pub fn has_entries(&self) -> bool {
        !self.report.is_empty() || self.total_hours.is_some_and(|h| h > Decimal::ZERO)
    }
}

/// Rounds hours up to the next 6-minute (0.1h) increment.
pub fn round_entry(hours: Decimal) -> Decimal {
    hours.round_dp_with_strategy(1, RoundingStrategy::AwayFromZero)
}

/// Rounds a per-client total to 4 significant digits, half-up.
pub fn round_total(hours: Decimal) -> Decimal {
    hours
        .round_sf_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        .unwrap_or(hours)
}

/// Sums hours per client name for entries inside `window`.
pub fn aggregate_hours(entries: &[TimeEntry], window: &MonthWindow) -> HourTotals {
    let mut totals = HourTotals::new();
    for entry in entries.iter().filter(|e| window.contains(e.spent_date)) {
        *totals.entry(entry.client.name.clone()).or_default() += round_entry(entry.hours);
    }
    for total in totals.values_mut() {
        *total = round_total(*total);
    }
    totals
}

fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds the report for a remote-hours client.
///
/// Flat-salary contracts derive the hourly rate from the salary and the
/// total tracked hours; hourly contracts pass their rate through. The rate
/// is reported unrounded so every row's amount is its rate times its hours.
/// No tracked hours yields an empty report.
pub fn hourly_report(data: &HarvestData, totals: &HourTotals) -> Result<CalculatedReport, ReportError> {
    let total_hours: Decimal = totals.values().copied().sum();
    if total_hours.is_zero() {
        return Ok(CalculatedReport::default());
    }

    let (rate, flat_salary, total) = match data.contract_type {
        Some(ContractType::FlatSalary) => {
            let salary = data.flat_salary.ok_or(ReportError::MissingAmount("flat salary"))?;
            let rate = salary
                .checked_div(total_hours)
                .ok_or(ReportError::NoHours)?;
            (rate, Some(salary), Some(total_hours))
        }
        Some(ContractType::HourlyRate) => {
            let rate = data.hourly_rate.ok_or(ReportError::MissingAmount("hourly rate"))?;
            (rate, None, None)
        }
        None => return Err(ReportError::MissingContract),
    };

    let report = totals
        .iter()
        .map(|(name, hours)| ReportRow {
            project_name: name.clone(),
            hourly_rate: Some(rate),
            hours: Some(*hours),
            amount: money(rate * *hours),
        })
        .collect();

    Ok(CalculatedReport {
        report,
        hourly_rate: Some(rate),
        flat_salary,
        total_hours: total,
    })
}

/// Builds the single-row report for a fixed-rate client.
pub fn fixed_report(data: &FixedRateData) -> Result<CalculatedReport, ReportError> {
    let amount: Decimal = data
        .rate
        .trim()
        .parse()
        .map_err(|_| ReportError::InvalidRate(data.rate.clone()))?;

    Ok(CalculatedReport {
        report: vec![ReportRow {
            project_name: data.description.clone(),
            hourly_rate: None,
            hours: None,
            amount,
        }],
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::types::EntryClient;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn entry(client: &str, hours: Decimal, day: (i32, u32, u32)) -> TimeEntry {
        TimeEntry {
            hours,
            spent_date: NaiveDate::from_ymd_opt(day.0, day.1, day.2).unwrap(),
            client: EntryClient { name: client.into() },
        }
    }

    fn march() -> MonthWindow {
        MonthWindow::new(2024, 3).unwrap()
    }

    #[test]
    fn entries_round_up_before_summing() {
        let entries = vec![
            entry("Acme", dec!(1.02), (2024, 3, 4)),
            entry("Acme", dec!(1.03), (2024, 3, 5)),
        ];
        let totals = aggregate_hours(&entries, &march());
        assert_eq!(totals["Acme"], dec!(2.2));
    }

    #[test]
    fn exact_tenths_are_unchanged() {
        assert_eq!(round_entry(dec!(1.5)), dec!(1.5));
        assert_eq!(round_entry(dec!(0.01)), dec!(0.1));
    }

    #[test]
    fn totals_round_to_four_significant_digits() {
        assert_eq!(round_total(dec!(123.45)), dec!(123.5));
        assert_eq!(round_total(dec!(1234.4)), dec!(1234));
        assert_eq!(round_total(dec!(2.2)), dec!(2.2));
    }

    #[test]
    fn entries_outside_the_month_are_skipped() {
        let entries = vec![
            entry("Acme", dec!(2), (2024, 3, 31)),
            entry("Acme", dec!(5), (2024, 4, 1)),
            entry("Other", dec!(3), (2024, 2, 29)),
        ];
        let totals = aggregate_hours(&entries, &march());
        assert_eq!(totals.len(), 1);
        assert_eq!(totals["Acme"], dec!(2.0));
    }

    #[test]
    fn totals_are_grouped_by_client_name() {
        let entries = vec![
            entry("Acme", dec!(1), (2024, 3, 1)),
            entry("Globex", dec!(2), (2024, 3, 2)),
            entry("Acme", dec!(3), (2024, 3, 3)),
        ];
        let totals = aggregate_hours(&entries, &march());
        assert_eq!(totals["Acme"], dec!(4));
        assert_eq!(totals["Globex"], dec!(2));
    }

    #[test]
    fn flat_salary_derives_rate() {
        let data = HarvestData {
            flat_salary: Some(dec!(3000)),
            contract_type: Some(ContractType::FlatSalary),
            ..Default::default()
        };
        let totals = HourTotals::from([("Acme".to_string(), dec!(100))]);
        let report = hourly_report(&data, &totals).unwrap();

        assert_eq!(report.hourly_rate, Some(dec!(30)));
        assert_eq!(report.total_hours, Some(dec!(100)));
        assert_eq!(report.flat_salary, Some(dec!(3000)));
        assert_eq!(report.report[0].amount, dec!(3000));
    }

    #[test]
    fn hourly_rate_passes_through_without_total() {
        let data = HarvestData {
            hourly_rate: Some(dec!(45)),
            contract_type: Some(ContractType::HourlyRate),
            ..Default::default()
        };
        let totals = HourTotals::from([("Acme".to_string(), dec!(10.5))]);
        let report = hourly_report(&data, &totals).unwrap();

        assert_eq!(report.hourly_rate, Some(dec!(45)));
        assert_eq!(report.total_hours, None);
        assert_eq!(report.report[0].amount, dec!(472.50));
    }

    #[test]
    fn flat_salary_with_zero_hours_is_an_empty_report() {
        let data = HarvestData {
            flat_salary: Some(dec!(3000)),
            contract_type: Some(ContractType::FlatSalary),
            ..Default::default()
        };
        let totals = HourTotals::from([("Acme".to_string(), Decimal::ZERO)]);
        let report = hourly_report(&data, &totals).unwrap();
        assert_eq!(report, CalculatedReport::default());
        assert!(!report.has_entries());
    }

    #[test]
    fn flat_salary_rows_agree_with_their_rate() {
        let data = HarvestData {
            flat_salary: Some(dec!(3000)),
            contract_type: Some(ContractType::FlatSalary),
            ..Default::default()
        };
        let totals = HourTotals::from([("Acme".to_string(), dec!(70))]);
        let report = hourly_report(&data, &totals).unwrap();

        let row = &report.report[0];
        let rate = row.hourly_rate.unwrap();
        assert_eq!(report.hourly_rate, Some(rate));
        assert_eq!(rate, dec!(3000) / dec!(70));
        assert_eq!(money(rate * row.hours.unwrap()), row.amount);
        assert_eq!(row.amount, dec!(3000.00));
    }

    #[test]
    fn flat_salary_split_across_clients_sums_to_salary() {
        let data = HarvestData {
            flat_salary: Some(dec!(3000)),
            contract_type: Some(ContractType::FlatSalary),
            ..Default::default()
        };
        let totals = HourTotals::from([
            ("Acme".to_string(), dec!(30)),
            ("Globex".to_string(), dec!(40)),
        ]);
        let report = hourly_report(&data, &totals).unwrap();

        for row in &report.report {
            assert_eq!(money(row.hourly_rate.unwrap() * row.hours.unwrap()), row.amount);
        }
        let billed: Decimal = report.report.iter().map(|r| r.amount).sum();
        assert_eq!(billed, dec!(3000.00));
    }

    #[test]
    fn no_tracked_clients_is_an_empty_report() {
        let data = HarvestData {
            flat_salary: Some(dec!(3000)),
            contract_type: Some(ContractType::FlatSalary),
            ..Default::default()
        };
        let report = hourly_report(&data, &HourTotals::new()).unwrap();
        assert!(!report.has_entries());
    }

    #[test]
    fn fixed_report_parses_rate() {
        let report = fixed_report(&FixedRateData {
            rate: " 1500.50 ".into(),
            description: "Monthly retainer".into(),
        })
        .unwrap();
        assert_eq!(report.report.len(), 1);
        assert_eq!(report.report[0].amount, dec!(1500.50));
        assert!(report.has_entries());
    }

    #[test]
    fn fixed_report_rejects_garbage() {
        let err = fixed_report(&FixedRateData {
            rate: "abc".into(),
            description: String::new(),
        })
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidRate(r) if r == "abc"));
    }

    #[test]
    fn empty_report_has_no_entries() {
        assert!(!CalculatedReport::default().has_entries());
        let hours_only = CalculatedReport {
            total_hours: Some(dec!(1)),
            ..Default::default()
        };
        assert!(hours_only.has_entries());
    }

    proptest! {
        #[test]
        fn rounded_entry_never_below_input(cents in 0i64..100_000) {
            let hours = Decimal::new(cents, 2);
            let rounded = round_entry(hours);
            prop_assert!(rounded >= hours);
            prop_assert!(rounded - hours < dec!(0.1));
            prop_assert!(rounded.scale() <= 1);
        }
    }
}
