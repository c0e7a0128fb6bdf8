// src/balance.rs
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest line that carries every column of the legacy movement record.
pub const MIN_LINE_WIDTH: usize = 29;

/// One record decoded from a fixed-offset movement line. Column map
/// (0-based, end-exclusive): company [0,4), year [4,8), month [8,10),
/// registration [10,16), event code [16,20), value in minutes [20,29).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub company: String,
    pub year: i32,
    pub month: u32,
    pub registration: String,
    pub event_code: String,
    pub value_minutes: i64,
}

/// Typed markers for malformed input. Decoding keeps going: missing columns
/// come out empty or zero and the marker records what was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    #[error("line {line}: record has {got} characters, expected at least {expected}")]
    ShortLine {
        line: usize,
        got: usize,
        expected: usize,
    },
    #[error("line {line}: {column} column is not numeric: '{text}'")]
    NonNumericColumn {
        line: usize,
        column: &'static str,
        text: String,
    },
}

#[derive(Debug, Default)]
pub struct ParsedMovements {
    pub events: Vec<Event>,
    pub warnings: Vec<ParseWarning>,
}

fn columns(line: &str, start: usize, end: usize) -> String {
    line.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn numeric_column<T: FromStr + Default>(
    text: &str,
    column: &'static str,
    line: usize,
    warnings: &mut Vec<ParseWarning>,
) -> T {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return T::default();
    }
    match trimmed.parse() {
        Ok(value) => value,
        Err(_) => {
            warnings.push(ParseWarning::NonNumericColumn {
                line,
                column,
                text: trimmed.to_string(),
            });
            T::default()
        }
    }
}

/// Decodes a raw movement file into events, one per non-blank line, in
/// input order. Lines are trimmed first, so CRLF and LF input both work.
pub fn parse_movements(content: &str) -> ParsedMovements {
    let mut parsed = ParsedMovements::default();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = index + 1;

        let width = line.chars().count();
        if width < MIN_LINE_WIDTH {
            parsed.warnings.push(ParseWarning::ShortLine {
                line: line_number,
                got: width,
                expected: MIN_LINE_WIDTH,
            });
        }

        let year = numeric_column::<i32>(&columns(line, 4, 8), "year", line_number, &mut parsed.warnings);
        let month =
            numeric_column::<u32>(&columns(line, 8, 10), "month", line_number, &mut parsed.warnings);
        let value_minutes = numeric_column::<i64>(
            &columns(line, 20, 29),
            "value",
            line_number,
            &mut parsed.warnings,
        );

        parsed.events.push(Event {
            company: columns(line, 0, 4),
            year,
            month,
            registration: columns(line, 10, 16),
            event_code: columns(line, 16, 20),
            value_minutes,
        });
    }

    parsed
}

// --- Event-code buckets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceBucket {
    Overtime100,
    Overtime50,
    UnjustifiedAbsence,
    JustifiedAbsence,
    MedicalCertificate,
}

/// Event-code membership per bucket. Payroll vendors disagree on the code
/// convention, so the table is data and can be loaded from JSON per
/// deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventCodeTable {
    #[serde(default)]
    pub overtime_100: Vec<String>,
    #[serde(default)]
    pub overtime_50: Vec<String>,
    #[serde(default)]
    pub unjustified_absence: Vec<String>,
    #[serde(default)]
    pub justified_absence: Vec<String>,
    #[serde(default)]
    pub medical_certificate: Vec<String>,
}

impl Default for EventCodeTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

impl EventCodeTable {
    /// The 2805 through 2809 mapping used by the legacy balance report.
    pub fn standard() -> Self {
        Self {
            overtime_100: codes(&["2805"]),
            overtime_50: codes(&["2806"]),
            unjustified_absence: codes(&["2807"]),
            justified_absence: codes(&["2808"]),
            medical_certificate: codes(&["2809"]),
        }
    }

    /// Deployments on the 2900 code range book overtime under 2901/2902;
    /// the absence codes stay in the 2800 range.
    pub fn range_2900() -> Self {
        Self {
            overtime_100: codes(&["2901"]),
            overtime_50: codes(&["2902"]),
            unjustified_absence: codes(&["2807"]),
            justified_absence: codes(&["2808"]),
            medical_certificate: codes(&["2809"]),
        }
    }

    pub fn bucket_for(&self, code: &str) -> Option<BalanceBucket> {
        let hit = |list: &[String]| list.iter().any(|c| c == code);
        if hit(&self.overtime_100) {
            Some(BalanceBucket::Overtime100)
        } else if hit(&self.overtime_50) {
            Some(BalanceBucket::Overtime50)
        } else if hit(&self.unjustified_absence) {
            Some(BalanceBucket::UnjustifiedAbsence)
        } else if hit(&self.justified_absence) {
            Some(BalanceBucket::JustifiedAbsence)
        } else if hit(&self.medical_certificate) {
            Some(BalanceBucket::MedicalCertificate)
        } else {
            None
        }
    }
}

// --- Reconciliation ---

/// Remaining balances for one employee registration after unjustified
/// absences were paid off against the overtime pools.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceResult {
    pub registration: String,
    pub overtime_remaining_hours: f64,
    pub absence_remaining_hours: f64,
    pub justified_absence_hours: f64,
    pub medical_certificate_hours: f64,
}

/// Moves `min(absence, pool)` hours out of both sides.
fn consume(absence_hours: &mut f64, pool_hours: &mut f64) {
    if *absence_hours <= 0.0 {
        return;
    }
    let used = absence_hours.min(*pool_hours);
    *absence_hours -= used;
    *pool_hours -= used;
}

/// Groups events by registration (encounter order), sums the bucketed
/// minute values, converts to hours and offsets unjustified absences
/// against overtime at 100% first, then at 50%.
pub fn reconcile(events: &[Event], table: &EventCodeTable) -> Vec<BalanceResult> {
    let mut registration_order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Event>> = HashMap::new();
    for event in events {
        groups
            .entry(event.registration.as_str())
            .or_insert_with(|| {
                registration_order.push(event.registration.as_str());
                Vec::new()
            })
            .push(event);
    }

    registration_order
        .into_iter()
        .map(|registration| {
            let group = &groups[registration];
            let bucket_hours = |bucket: BalanceBucket| {
                group
                    .iter()
                    .filter(|e| table.bucket_for(&e.event_code) == Some(bucket))
                    .map(|e| e.value_minutes)
                    .sum::<i64>() as f64
                    / 60.0
            };

            let mut overtime_100 = bucket_hours(BalanceBucket::Overtime100);
            let mut overtime_50 = bucket_hours(BalanceBucket::Overtime50);
            let mut absence = bucket_hours(BalanceBucket::UnjustifiedAbsence);
            let justified = bucket_hours(BalanceBucket::JustifiedAbsence);
            let medical = bucket_hours(BalanceBucket::MedicalCertificate);

            consume(&mut absence, &mut overtime_100);
            consume(&mut absence, &mut overtime_50);

            BalanceResult {
                registration: registration.to_string(),
                overtime_remaining_hours: overtime_100 + overtime_50,
                absence_remaining_hours: absence,
                justified_absence_hours: justified,
                medical_certificate_hours: medical,
            }
        })
        .collect()
}
