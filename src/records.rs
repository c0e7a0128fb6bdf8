// src/records.rs
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::layout::Layout;

/// Descriptive employee data joined onto a launch by the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeRef {
    pub name: String,
    pub employee_code: String,
    pub company_payroll_number: String,
    pub payroll_number: String,
}

/// Descriptive event data joined onto a launch by the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRef {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// One event launch: an amount of some payroll event booked for an employee
/// on a date, already joined with the descriptive data the renderer needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventLaunch {
    pub employee_id: String,
    pub launch_date: NaiveDate,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_value: Decimal,
    pub total_value: Decimal,
    #[serde(default)]
    pub employee: Option<EmployeeRef>,
    #[serde(default)]
    pub event: Option<EventRef>,
}

/// Flat row shape used at the CSV boundary; the joined employee and event
/// columns may be blank when the store had no match.
#[derive(Debug, Deserialize)]
struct LaunchRow {
    employee_id: String,
    launch_date: NaiveDate,
    quantity: Decimal,
    #[serde(default)]
    unit_value: Option<Decimal>,
    total_value: Decimal,
    #[serde(default)]
    employee_name: Option<String>,
    #[serde(default)]
    employee_code: Option<String>,
    #[serde(default)]
    company_payroll_number: Option<String>,
    #[serde(default)]
    payroll_number: Option<String>,
    #[serde(default)]
    event_code: Option<String>,
    #[serde(default)]
    event_description: Option<String>,
}

impl From<LaunchRow> for EventLaunch {
    fn from(row: LaunchRow) -> Self {
        let employee = if row.employee_name.is_none()
            && row.employee_code.is_none()
            && row.company_payroll_number.is_none()
            && row.payroll_number.is_none()
        {
            None
        } else {
            Some(EmployeeRef {
                name: row.employee_name.unwrap_or_default(),
                employee_code: row.employee_code.unwrap_or_default(),
                company_payroll_number: row.company_payroll_number.unwrap_or_default(),
                payroll_number: row.payroll_number.unwrap_or_default(),
            })
        };
        let event = row.event_code.map(|code| EventRef {
            code,
            description: row.event_description.unwrap_or_default(),
        });

        EventLaunch {
            employee_id: row.employee_id,
            launch_date: row.launch_date,
            quantity: row.quantity,
            unit_value: row.unit_value.unwrap_or_default(),
            total_value: row.total_value,
            employee,
            event,
        }
    }
}

/// Loads a layout definition, then normalizes its field positions so stored
/// offsets can never disagree with the field sizes.
pub fn load_layout(path: &Path) -> Result<Layout> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading layout file {}", path.display()))?;
    let mut layout: Layout = serde_json::from_str(&text)
        .with_context(|| format!("parsing layout file {}", path.display()))?;
    layout.recalculate_positions();
    info!(
        "Loaded layout '{}' with {} fields ({} columns)",
        layout.name,
        layout.fields.len(),
        layout.total_width()
    );
    Ok(layout)
}

pub fn launches_from_reader<R: Read>(reader: R) -> Result<Vec<EventLaunch>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut launches = Vec::new();
    for row in csv_reader.deserialize::<LaunchRow>() {
        let row = row.context("parsing event launch row")?;
        launches.push(row.into());
    }
    Ok(launches)
}

pub fn load_launches(path: &Path) -> Result<Vec<EventLaunch>> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening launches file {}", path.display()))?;
    let launches = launches_from_reader(file)
        .with_context(|| format!("reading launches file {}", path.display()))?;
    info!(
        "Loaded {} event launches from {}",
        launches.len(),
        path.display()
    );
    Ok(launches)
}
