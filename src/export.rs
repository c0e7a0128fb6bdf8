// src/export.rs
use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::debug;

use crate::layout::{DecimalSeparator, FieldKind, Layout, LayoutField, ReportType};
use crate::records::EventLaunch;

/// Event codes carrying this token are overtime and take the extra factor.
pub const EXTRA_EVENT_MARKER: &str = "EXTRA";
/// Event codes carrying this token are night shift and take the night factor.
pub const NIGHT_EVENT_MARKER: &str = "NOTURNO";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("no event launches found between {start} and {end}")]
    EmptyResultSet { start: NaiveDate, end: NaiveDate },
}

/// Non-fatal conditions observed while rendering. The document is still
/// produced; callers decide whether to surface these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    #[error("line {line}: field '{field_name}' rendered {rendered} characters, truncated to {size}")]
    TruncatedField {
        line: usize,
        field_name: String,
        rendered: usize,
        size: usize,
    },
}

/// The rendered export body plus everything lossy that happened on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub text: String,
    pub warnings: Vec<ExportWarning>,
}

/// Multiplies a monetary amount by the layout factors whose marker token
/// appears in the event code. Extra applies before night; both may compound.
pub fn apply_factors(value: Decimal, layout: &Layout, event_code: &str) -> Decimal {
    let mut result = value;
    if layout.multiply_extra_factor && event_code.contains(EXTRA_EVENT_MARKER) {
        result *= layout.extra_factor;
    }
    if layout.multiply_night_factor && event_code.contains(NIGHT_EVENT_MARKER) {
        result *= layout.night_factor;
    }
    result
}

/// Renders a decimal amount with two fixed places and the layout's decimal
/// separator policy.
pub fn format_decimal(value: Decimal, separator: DecimalSeparator) -> String {
    let fixed = format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    );
    match separator {
        DecimalSeparator::Dot => fixed,
        DecimalSeparator::Comma => fixed.replace('.', ","),
        DecimalSeparator::None => fixed.replace('.', ""),
    }
}

fn pad_start(value: &str, width: usize, fill: char) -> String {
    let length = value.chars().count();
    if length >= width {
        return value.to_string();
    }
    let mut padded = String::with_capacity(width);
    for _ in length..width {
        padded.push(fill);
    }
    padded.push_str(value);
    padded
}

fn pow10(places: u32) -> Decimal {
    // 10^19 is the largest power of ten that fits an u64.
    Decimal::from(10u64.pow(places.min(19)))
}

fn event_code_of(launch: &EventLaunch) -> &str {
    launch.event.as_ref().map(|e| e.code.as_str()).unwrap_or("")
}

/// Resolves the raw string value a field takes from one launch, before any
/// sizing is applied.
fn resolve_source(field: &LayoutField, launch: &EventLaunch, layout: &Layout) -> String {
    let employee = launch.employee.as_ref();
    match field.kind() {
        FieldKind::CompanyPayrollNumber => employee
            .map(|e| e.company_payroll_number.clone())
            .unwrap_or_default(),
        FieldKind::PayrollNumber => employee
            .map(|e| e.payroll_number.clone())
            .unwrap_or_default(),
        FieldKind::EmployeeName => employee.map(|e| e.name.clone()).unwrap_or_default(),
        FieldKind::EmployeeCode => employee
            .map(|e| e.employee_code.clone())
            .unwrap_or_default(),
        // A non-empty default value pins a fixed event code for this column.
        FieldKind::EventCode => field
            .default_value
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| launch.event.as_ref().map(|e| e.code.clone()))
            .unwrap_or_default(),
        FieldKind::EventDate => field.date_format.format(launch.launch_date),
        FieldKind::Amount => {
            let adjusted = apply_factors(launch.total_value, layout, event_code_of(launch));
            if field.decimal_places > 0 {
                let scaled = (adjusted * pow10(field.decimal_places)).trunc();
                scaled.to_i64().unwrap_or(0).to_string()
            } else {
                adjusted.floor().to_i64().unwrap_or(0).to_string()
            }
        }
        FieldKind::Quantity => launch.quantity.trunc().to_i64().unwrap_or(0).to_string(),
        FieldKind::Literal => field.default_value.clone().unwrap_or_default(),
    }
}

/// Forces the raw value into exactly `field_size` characters: oversized
/// content is cut to the first `field_size` characters and reported as a
/// warning, short content is left-padded with the fill character. A zero
/// size leaves the value untouched.
fn fit_to_size(
    raw: String,
    field: &LayoutField,
    line: usize,
    warnings: &mut Vec<ExportWarning>,
) -> String {
    let size = field.field_size;
    if size == 0 {
        return raw;
    }
    let length = raw.chars().count();
    if length > size {
        debug!(
            "Truncating field '{}' on line {}: {} -> {} characters",
            field.field_name, line, length, size
        );
        warnings.push(ExportWarning::TruncatedField {
            line,
            field_name: field.field_name.clone(),
            rendered: length,
            size,
        });
        return raw.chars().take(size).collect();
    }
    if length < size {
        return pad_start(&raw, size, field.fill_type.fill_char());
    }
    raw
}

/// Renders one field of one launch into its exact fixed-width form.
pub(crate) fn render_field(
    field: &LayoutField,
    launch: &EventLaunch,
    layout: &Layout,
    line: usize,
    warnings: &mut Vec<ExportWarning>,
) -> String {
    let raw = resolve_source(field, launch, layout);
    fit_to_size(raw, field, line, warnings)
}

/// Selects the launches inside the inclusive date window and orders them by
/// employee, then chronologically.
fn select_window<'a>(
    launches: &'a [EventLaunch],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&'a EventLaunch> {
    let mut selected: Vec<&EventLaunch> = launches
        .iter()
        .filter(|l| l.launch_date >= start && l.launch_date <= end)
        .collect();
    selected.sort_by(|a, b| {
        a.employee_id
            .cmp(&b.employee_id)
            .then(a.launch_date.cmp(&b.launch_date))
    });
    selected
}

/// Renders the full export document for one layout over one batch of
/// launches. Lines are joined with `\n`, no trailing newline, no header or
/// footer.
pub fn generate_export(
    layout: &Layout,
    launches: &[EventLaunch],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ExportDocument, ExportError> {
    let selected = select_window(launches, start, end);
    if selected.is_empty() {
        return Err(ExportError::EmptyResultSet { start, end });
    }

    let fields = layout.ordered_fields();
    let separator = layout.field_separator.as_str();
    let mut warnings = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    match layout.report_type {
        ReportType::OneEventPerLine => {
            for launch in &selected {
                let line_number = lines.len() + 1;
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|field| render_field(field, launch, layout, line_number, &mut warnings))
                    .collect();
                lines.push(rendered.join(separator));
            }
        }
        ReportType::OneEmployeePerLine => {
            let mut employee_order: Vec<&str> = Vec::new();
            let mut groups: HashMap<&str, Vec<&EventLaunch>> = HashMap::new();
            for launch in &selected {
                groups
                    .entry(launch.employee_id.as_str())
                    .or_insert_with(|| {
                        employee_order.push(launch.employee_id.as_str());
                        Vec::new()
                    })
                    .push(launch);
            }

            for employee_id in employee_order {
                let group = &groups[employee_id];
                let first = group[0];
                let line_number = lines.len() + 1;
                let mut rendered_fields: Vec<String> = Vec::with_capacity(fields.len());

                for field in &fields {
                    // Monetary columns take the factor-adjusted sum over the
                    // whole group; identity and date columns come from the
                    // group's first launch.
                    let mut value = if field.field_name.contains("Valor") {
                        let total: Decimal = group
                            .iter()
                            .map(|l| apply_factors(l.total_value, layout, event_code_of(l)))
                            .sum();
                        if field.field_name == "Valor (Inteiro)" {
                            total.floor().to_i64().unwrap_or(0).to_string()
                        } else if field.field_name == "Valor (Decimal)" {
                            let cents = ((total - total.floor()) * dec!(100))
                                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
                            format!("{:02}", cents.to_i64().unwrap_or(0))
                        } else {
                            format_decimal(total, layout.decimal_separator)
                        }
                    } else {
                        render_field(field, first, layout, line_number, &mut warnings)
                    };

                    if let Some(pattern) = &field.format_pattern {
                        if pattern.contains('0') && !value.is_empty() {
                            value = pad_start(&value, pattern.chars().count(), '0');
                        }
                    }
                    rendered_fields.push(value);
                }
                lines.push(rendered_fields.join(separator));
            }
        }
    }

    Ok(ExportDocument {
        text: lines.join("\n"),
        warnings,
    })
}
