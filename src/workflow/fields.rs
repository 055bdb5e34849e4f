//! Transient form schema carried by workflow contexts.
//!
//! The schema drives prompt labels, select options and review tables. It is
//! never persisted.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub label: &'static str,
    pub key: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Input,
    Select(Vec<FieldOption>),
    Table(Vec<Column>),
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub label: String,
    pub kind: FieldKind,
}

impl Field {
    fn input(key: &'static str, label: &str) -> Self {
        Self {
            key,
            label: label.to_string(),
            kind: FieldKind::Input,
        }
    }

    fn select(key: &'static str, label: &str, options: Vec<FieldOption>) -> Self {
        Self {
            key,
            label: label.to_string(),
            kind: FieldKind::Select(options),
        }
    }

    fn table(key: &'static str, label: &str, columns: &[(&'static str, &'static str)]) -> Self {
        Self {
            key,
            label: label.to_string(),
            kind: FieldKind::Table(
                columns
                    .iter()
                    .map(|&(label, key)| Column { label, key })
                    .collect(),
            ),
        }
    }

    fn loading(key: &'static str, label: &str) -> Self {
        Self {
            key,
            label: label.to_string(),
            kind: FieldKind::Loading,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<Field>,
}

impl FormSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Prompt label for `key`, or the key itself when unknown.
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|f| f.label.as_str()).unwrap_or(key)
    }

    pub fn options(&self, key: &str) -> &[FieldOption] {
        match self.get(key).map(|f| &f.kind) {
            Some(FieldKind::Select(options)) => options,
            _ => &[],
        }
    }

    pub fn columns(&self, key: &str) -> &[Column] {
        match self.get(key).map(|f| &f.kind) {
            Some(FieldKind::Table(columns)) => columns,
            _ => &[],
        }
    }

    /// Display label of the option whose value is `value`.
    pub fn option_label(&self, key: &str, value: &str) -> Option<&str> {
        self.options(key)
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    /// Replaces the options of a select field, e.g. with the list of clients.
    pub fn set_options(&mut self, key: &str, options: Vec<FieldOption>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.key == key) {
            field.kind = FieldKind::Select(options);
        }
    }
}

fn yes_no(yes: &str, no: &str) -> Vec<FieldOption> {
    vec![FieldOption::new("Yes", yes), FieldOption::new("No", no)]
}

pub fn base_info_schema() -> FormSchema {
    FormSchema::new(vec![
        Field::input("firstname", "First Name"),
        Field::input("lastname", "Last Name"),
        Field::table(
            "review",
            "Review",
            &[("First Name", "firstname"), ("Last Name", "lastname")],
        ),
    ])
}

pub fn client_schema() -> FormSchema {
    FormSchema::new(vec![
        Field::input("name", "Name"),
        Field::select(
            "provider",
            "Provider",
            vec![
                FieldOption::new("Harvest", "harvest"),
                FieldOption::new("Fixed", "fixed_rate"),
            ],
        ),
        Field::table(
            "review",
            "Review",
            &[
                ("Name", "name"),
                ("Provider", "provider"),
                ("Type of Contract", "typeOfContract"),
                ("Flat Salary", "flatSalary"),
                ("Hourly Rate", "hourlyRate"),
                ("Fixed Rate", "fixedRate"),
                ("Description", "fixedRateDescription"),
                ("Harvest (status)", "harvest"),
            ],
        ),
    ])
}

pub fn harvest_schema() -> FormSchema {
    FormSchema::new(vec![
        Field::input("accountId", "Account ID"),
        Field::input("token", "Token"),
        Field::select(
            "typeOfContract",
            "Specify the type of arrangement/contract with this client",
            vec![
                FieldOption::new("Flat Salary", "flat_salary"),
                FieldOption::new("Hourly Rate", "hourly_rate"),
            ],
        ),
        Field::input("flat_salary", "Enter flat salary"),
        Field::input("hourly_rate", "Enter hourly rate"),
        Field::loading("loading", "Validating credentials"),
        Field::select(
            "retry",
            "Invalid token/Account ID. Do you want to re-enter them?",
            yes_no("accountId", "failure"),
        ),
    ])
}

pub fn fixed_rate_schema() -> FormSchema {
    FormSchema::new(vec![
        Field::input("rate", "Total amount"),
        Field::input("description", "Description"),
        Field::table(
            "review",
            "Review",
            &[("Total amount", "rate"), ("Description", "description")],
        ),
    ])
}

pub fn payment_options() -> Vec<FieldOption> {
    vec![
        FieldOption::new("PayPal", "paypal"),
        FieldOption::new("International Wire", "international-wire"),
        FieldOption::new("Domestic Wire", "domestic-wire"),
        FieldOption::new("Payonner", "payonner"),
        FieldOption::new("Transferwise", "transferwise"),
    ]
}

pub fn month_options() -> Vec<FieldOption> {
    (1..=12)
        .map(|m| FieldOption::new(crate::calendar::month_name(m), m.to_string()))
        .collect()
}

pub fn invoice_schema() -> FormSchema {
    FormSchema::new(vec![
        Field::select("client", "Pick a client to invoice", Vec::new()),
        Field::select("payment", "Pick a Payment method", payment_options()),
        Field::select("year", "Pick a year", Vec::new()),
        Field::select("month", "Pick a month", month_options()),
        Field::loading("calculating", "Retrieving data"),
        Field::loading(
            "check_dependencies",
            "Checking that all dependencies are in place",
        ),
        Field::loading("generate", "Generating invoice"),
        Field::table(
            "review",
            "Details",
            &[
                ("Name", "name"),
                ("Provider", "provider"),
                ("Total Hours", "totalHours"),
                ("Month", "month"),
                ("Year", "year"),
                ("Payment Method", "payment_method"),
                ("Hourly Rate", "hourlyRate"),
                ("Flat Salary", "flatSalary"),
            ],
        ),
        Field::select(
            "retry_month",
            "It seems that there are no entries for that period. Do you want to select another month?",
            yes_no("yes", "no"),
        ),
        Field::select(
            "retry_calculating",
            "Something went wrong while making the math. Feeling lucky and want to retry?",
            yes_no("yes", "no"),
        ),
        Field::select(
            "retry_check_dependencies",
            "Missing dependencies. Do you want to check again?",
            yes_no("yes", "no"),
        ),
        Field::select(
            "retry_generate",
            "Something went wrong while generating the invoice. Do you want to retry?",
            yes_no("yes", "no"),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_label_lookup() {
        let schema = invoice_schema();
        assert_eq!(
            schema.option_label("payment", "international-wire"),
            Some("International Wire")
        );
        assert_eq!(schema.option_label("payment", "cash"), None);
    }

    #[test]
    fn month_options_are_one_based() {
        let months = month_options();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], FieldOption::new("January", "1"));
        assert_eq!(months[11], FieldOption::new("December", "12"));
    }

    #[test]
    fn set_options_replaces_select_values() {
        let mut schema = invoice_schema();
        assert!(schema.options("client").is_empty());
        schema.set_options("client", vec![FieldOption::new("Acme", "c1")]);
        assert_eq!(schema.option_label("client", "c1"), Some("Acme"));
    }

    #[test]
    fn unknown_key_falls_back() {
        let schema = FormSchema::default();
        assert_eq!(schema.label("missing"), "missing");
        assert!(schema.options("missing").is_empty());
        assert!(schema.columns("missing").is_empty());
    }

    #[test]
    fn retry_options_map_to_targets() {
        let schema = harvest_schema();
        assert_eq!(schema.option_label("retry", "accountId"), Some("Yes"));
        assert_eq!(schema.option_label("retry", "failure"), Some("No"));
    }

    #[test]
    fn review_tables_have_columns() {
        assert_eq!(client_schema().columns("review").len(), 8);
        assert_eq!(fixed_rate_schema().columns("review")[0].key, "rate");
    }
}
