//! Terminal output: spinners and colored messages.
//!
//! Uses `indicatif` for the spinner shown while asynchronous steps run and
//! `console` for colors.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::records::{BaseInfo, ClientRecord, InvoiceRecord};
use crate::workflow::fields::Column;

/// Spinner shown while the engine runs effects.
pub struct Busy {
    pb: ProgressBar,
}

impl Busy {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

pub struct Palette {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    bold: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }
}

impl Palette {
    pub fn success(&self, message: &str) {
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn failure(&self, message: &str) {
        println!("  {} {message}", self.red.apply_to("✗"));
    }

    pub fn warning(&self, message: &str) {
        println!("  {} {message}", self.yellow.apply_to("!"));
    }

    pub fn heading(&self, title: &str) {
        println!();
        println!("{}", self.bold.apply_to(format!("─── {title} ───")));
    }

    /// Prints `label: value` pairs for the columns that have a value.
    pub fn details(&self, columns: &[Column], value: impl Fn(&str) -> Option<String>) {
        let width = columns.iter().map(|c| c.label.len()).max().unwrap_or(0);
        for column in columns {
            if let Some(v) = value(column.key).filter(|v| !v.is_empty()) {
                let label = format!("{:<width$}", column.label);
                println!("  {}  {v}", self.dim.apply_to(label));
            }
        }
    }

    pub fn table(&self, header: &[&str], rows: &[Vec<String>]) {
        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                rows.iter()
                    .filter_map(|r| r.get(i))
                    .map(String::len)
                    .chain([h.len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let line = |cells: Vec<String>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{c:<w$}"))
                .collect::<Vec<_>>()
                .join("  ")
        };
        println!(
            "  {}",
            self.bold
                .apply_to(line(header.iter().map(|h| h.to_string()).collect()))
        );
        for row in rows {
            println!("  {}", line(row.clone()));
        }
    }
}

/// Summary printed by the `status` subcommand.
pub fn print_status<'a>(
    palette: &Palette,
    base_info: &BaseInfo,
    clients: impl Iterator<Item = &'a ClientRecord>,
    invoices: impl Iterator<Item = &'a InvoiceRecord>,
) {
    palette.heading("Base info");
    if base_info.is_complete() {
        println!("  {}", base_info.full_name());
    } else {
        palette.warning("not set");
    }

    palette.heading("Clients");
    let clients: Vec<Vec<String>> = clients
        .map(|c| {
            vec![
                c.name.clone(),
                c.provider_kind.map(|k| k.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    if clients.is_empty() {
        println!("  none");
    } else {
        palette.table(&["Name", "Provider"], &clients);
    }

    palette.heading("Invoices");
    let invoices: Vec<Vec<String>> = invoices
        .map(|i| {
            vec![
                i.client_name.clone(),
                format!("{}-{:02}", i.year, i.month),
                i.files
                    .iter()
                    .map(|f| f.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect();
    if invoices.is_empty() {
        println!("  none");
    } else {
        palette.table(&["Client", "Period", "Files"], &invoices);
    }
}
