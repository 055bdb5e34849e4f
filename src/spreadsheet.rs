//! xlsx template handling: placeholder lookup, dependency checks and
//! writing the generated invoice.
//!
//! Placeholders are literal `{{name}}` tokens in the first sheet. Cells are
//! addressed as `(column, row)`, both 1-based.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{DependencyError, SpreadsheetError};
use crate::report::ReportRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedVariable {
    pub name: &'static str,
    pub required: bool,
}

pub const SUPPORTED_VARIABLES: [SupportedVariable; 7] = [
    SupportedVariable { name: "report", required: true },
    SupportedVariable { name: "totalHours", required: false },
    SupportedVariable { name: "hourlyRate", required: false },
    SupportedVariable { name: "flatSalary", required: false },
    SupportedVariable { name: "payment_method", required: true },
    SupportedVariable { name: "month", required: true },
    SupportedVariable { name: "year", required: true },
];

pub fn required_variables() -> Vec<&'static str> {
    SUPPORTED_VARIABLES
        .iter()
        .filter(|v| v.required)
        .map(|v| v.name)
        .collect()
}

pub fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(Decimal),
}

impl From<Option<Decimal>> for CellValue {
    fn from(value: Option<Decimal>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Empty)
    }
}

/// Value bound to a template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// Unused placeholder: the cell is cleared.
    Absent,
    Text(String),
    Number(Decimal),
    Report(Vec<ReportRow>),
    Rows(Vec<Vec<CellValue>>),
}

impl TemplateValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, TemplateValue::Absent)
    }

    /// Short rendering for review tables.
    pub fn display(&self) -> String {
        match self {
            TemplateValue::Absent => String::new(),
            TemplateValue::Text(text) => text.clone(),
            TemplateValue::Number(n) => n.round_dp(2).to_string(),
            TemplateValue::Report(rows) => format!("{} row(s)", rows.len()),
            TemplateValue::Rows(rows) => format!("{} row(s)", rows.len()),
        }
    }
}

pub type TemplateVariables = BTreeMap<String, TemplateValue>;

/// Reshapes named report rows into plain value rows in column order.
pub fn report_rows(rows: &[ReportRow]) -> Vec<Vec<CellValue>> {
    rows.iter()
        .map(|row| {
            vec![
                CellValue::Text(row.project_name.clone()),
                row.hourly_rate.into(),
                row.hours.into(),
                CellValue::Number(row.amount),
            ]
        })
        .collect()
}

/// Text content of the first sheet's non-empty cells.
#[derive(Debug, Clone, Default)]
pub struct Template {
    cells: Vec<((u32, u32), String)>,
}

impl Template {
    pub fn from_cells(cells: impl IntoIterator<Item = ((u32, u32), String)>) -> Self {
        let mut cells: Vec<_> = cells.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        // row-major, so "first" means top-left
        cells.sort_by_key(|&((col, row), _)| (row, col));
        Self { cells }
    }

    fn from_sheet(sheet: &Worksheet) -> Self {
        Self::from_cells(sheet.get_cell_collection().into_iter().map(|cell| {
            let coordinate = cell.get_coordinate();
            let col: u32 = coordinate.get_col_num().to_owned();
            let row: u32 = coordinate.get_row_num().to_owned();
            ((col, row), cell.get_value().to_string())
        }))
    }

    pub fn open(path: &Path) -> Result<Self, SpreadsheetError> {
        let book = read_book(path)?;
        let sheet = first_sheet(&book, path)?;
        Ok(Self::from_sheet(sheet))
    }

    /// Position of the first cell holding `{{variable}}`.
    pub fn find(&self, variable: &str) -> Option<(u32, u32)> {
        let token = placeholder(variable);
        self.cells
            .iter()
            .find(|(_, text)| text.contains(&token))
            .map(|(pos, _)| *pos)
    }

    pub fn missing_variables(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.find(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    pub fn check(&self, required: &[&str]) -> Result<(), DependencyError> {
        let missing = self.missing_variables(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DependencyError::MissingVariables(missing))
        }
    }
}

fn read_book(path: &Path) -> Result<Spreadsheet, SpreadsheetError> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| SpreadsheetError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn first_sheet<'a>(book: &'a Spreadsheet, path: &Path) -> Result<&'a Worksheet, SpreadsheetError> {
    book.get_sheet(&0)
        .ok_or_else(|| SpreadsheetError::MissingSheet(path.to_path_buf()))
}

/// Verifies the template exists and holds every required placeholder.
pub fn check_dependencies(path: &Path, required: &[&str]) -> Result<(), DependencyError> {
    if !path.is_file() {
        return Err(DependencyError::MissingTemplate(path.to_path_buf()));
    }
    let template = Template::open(path).map_err(|e| DependencyError::Unreadable(e.to_string()))?;
    template.check(required)
}

fn write_cell(sheet: &mut Worksheet, (col, row): (u32, u32), value: &CellValue) {
    let cell = sheet.get_cell_mut((col, row));
    match value {
        CellValue::Empty => {
            cell.set_value(String::new());
        }
        CellValue::Text(text) => {
            cell.set_value(text.clone());
        }
        CellValue::Number(n) => {
            cell.set_value_number(n.to_f64().unwrap_or_default());
        }
    }
}

fn write_rows(sheet: &mut Worksheet, (col, row): (u32, u32), rows: &[Vec<CellValue>]) {
    if rows.is_empty() {
        write_cell(sheet, (col, row), &CellValue::Empty);
    }
    for (i, values) in rows.iter().enumerate() {
        for (j, value) in values.iter().enumerate() {
            write_cell(sheet, (col + j as u32, row + i as u32), value);
        }
    }
}

/// Fills the template's placeholders and writes `<output_dir>/<filename>.xlsx`.
///
/// `month` and `year` are written together as "Month, Year" into whichever
/// of the two placeholders comes first; the other one is cleared.
pub fn render(
    template_path: &Path,
    output_dir: &Path,
    filename: &str,
    variables: &TemplateVariables,
) -> Result<PathBuf, SpreadsheetError> {
    let mut book = read_book(template_path)?;
    let template = Template::from_sheet(first_sheet(&book, template_path)?);
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| SpreadsheetError::MissingSheet(template_path.to_path_buf()))?;

    let mut date_written = false;
    let date = format!(
        "{}, {}",
        variables.get("month").map(TemplateValue::display).unwrap_or_default(),
        variables.get("year").map(TemplateValue::display).unwrap_or_default(),
    );
    let mut date_cells: Vec<(u32, u32)> = ["month", "year"]
        .iter()
        .filter(|name| variables.contains_key(**name))
        .filter_map(|name| template.find(name))
        .collect();
    date_cells.sort_by_key(|&(col, row)| (row, col));

    for pos in date_cells {
        if date_written {
            write_cell(sheet, pos, &CellValue::Empty);
        } else {
            write_cell(sheet, pos, &CellValue::Text(date.clone()));
            date_written = true;
        }
    }

    for (name, value) in variables {
        if name == "month" || name == "year" {
            continue;
        }
        let Some(pos) = template.find(name) else {
            debug!(variable = %name, "no placeholder in template");
            continue;
        };
        match value {
            TemplateValue::Absent => write_cell(sheet, pos, &CellValue::Empty),
            TemplateValue::Text(text) => write_cell(sheet, pos, &CellValue::Text(text.clone())),
            TemplateValue::Number(n) => write_cell(sheet, pos, &CellValue::Number(*n)),
            TemplateValue::Report(rows) => write_rows(sheet, pos, &report_rows(rows)),
            TemplateValue::Rows(rows) => write_rows(sheet, pos, rows),
        }
    }

    std::fs::create_dir_all(output_dir).map_err(|e| SpreadsheetError::Write {
        path: output_dir.to_path_buf(),
        message: e.to_string(),
    })?;
    let output = output_dir.join(format!("{filename}.xlsx"));
    umya_spreadsheet::writer::xlsx::write(&book, &output).map_err(|e| SpreadsheetError::Write {
        path: output.clone(),
        message: e.to_string(),
    })?;
    info!(path = %output.display(), "invoice written");
    Ok(output)
}
