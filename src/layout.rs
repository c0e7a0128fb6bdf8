// src/layout.rs
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// --- Field-level enumerations ---

/// Pad character used when a rendered field is shorter than its fixed size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillType {
    #[default]
    Spaces,
    Zeros,
    Dash,
}

impl FillType {
    pub fn fill_char(self) -> char {
        match self {
            FillType::Spaces => ' ',
            FillType::Zeros => '0',
            FillType::Dash => '-',
        }
    }
}

/// Side that receives the real content. The current renderer pads on the
/// left for both values; `left` is accepted and stored but does not change
/// the padding side. See the pinning test in the export tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Right,
}

/// Literal inserted between adjacent fields on a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSeparator {
    #[default]
    None,
    Space,
    Dash,
    Dot,
    Underscore,
    Semicolon,
}

impl FieldSeparator {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldSeparator::None => "",
            FieldSeparator::Space => " ",
            FieldSeparator::Dash => "-",
            FieldSeparator::Dot => ".",
            FieldSeparator::Underscore => "_",
            FieldSeparator::Semicolon => ";",
        }
    }
}

/// How plain decimal values are rendered outside of scaled-integer fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Dot,
    Comma,
    None,
}

/// Whether the record stream is emitted verbatim or pre-aggregated per
/// employee before rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    OneEventPerLine,
    OneEmployeePerLine,
}

/// Date masks selectable per field. Tokens follow the Portuguese dd/mm/aaaa
/// convention used by the payroll vendors; any unrecognized token falls back
/// to `aaaammdd`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateFormat {
    Aaaa,
    Ddmmaaaa,
    DdMmAaaaSlash,
    DdMmAaSlash,
    #[default]
    Aaaammdd,
    AaaaMmDdDash,
    Ddmmaa,
    Aaaamm,
    Mmaaaa,
    Mm,
    Dd,
}

impl DateFormat {
    pub fn token(self) -> &'static str {
        match self {
            DateFormat::Aaaa => "aaaa",
            DateFormat::Ddmmaaaa => "ddmmaaaa",
            DateFormat::DdMmAaaaSlash => "dd/mm/aaaa",
            DateFormat::DdMmAaSlash => "dd/mm/aa",
            DateFormat::Aaaammdd => "aaaammdd",
            DateFormat::AaaaMmDdDash => "aaaa-mm-dd",
            DateFormat::Ddmmaa => "ddmmaa",
            DateFormat::Aaaamm => "aaaamm",
            DateFormat::Mmaaaa => "mmaaaa",
            DateFormat::Mm => "mm",
            DateFormat::Dd => "dd",
        }
    }

    pub fn format(self, date: NaiveDate) -> String {
        let year = date.year();
        let month = date.month();
        let day = date.day();
        let short_year = year.rem_euclid(100);

        match self {
            DateFormat::Aaaa => format!("{year}"),
            DateFormat::Ddmmaaaa => format!("{day:02}{month:02}{year}"),
            DateFormat::DdMmAaaaSlash => format!("{day:02}/{month:02}/{year}"),
            DateFormat::DdMmAaSlash => format!("{day:02}/{month:02}/{short_year:02}"),
            DateFormat::Aaaammdd => format!("{year}{month:02}{day:02}"),
            DateFormat::AaaaMmDdDash => format!("{year}-{month:02}-{day:02}"),
            DateFormat::Ddmmaa => format!("{day:02}{month:02}{short_year:02}"),
            DateFormat::Aaaamm => format!("{year}{month:02}"),
            DateFormat::Mmaaaa => format!("{month:02}{year}"),
            DateFormat::Mm => format!("{month:02}"),
            DateFormat::Dd => format!("{day:02}"),
        }
    }
}

impl From<String> for DateFormat {
    fn from(token: String) -> Self {
        match token.as_str() {
            "aaaa" => DateFormat::Aaaa,
            "ddmmaaaa" => DateFormat::Ddmmaaaa,
            "dd/mm/aaaa" => DateFormat::DdMmAaaaSlash,
            "dd/mm/aa" => DateFormat::DdMmAaSlash,
            "aaaammdd" => DateFormat::Aaaammdd,
            "aaaa-mm-dd" => DateFormat::AaaaMmDdDash,
            "ddmmaa" => DateFormat::Ddmmaa,
            "aaaamm" => DateFormat::Aaaamm,
            "mmaaaa" => DateFormat::Mmaaaa,
            "mm" => DateFormat::Mm,
            "dd" => DateFormat::Dd,
            _ => DateFormat::Aaaammdd,
        }
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.token().to_string()
    }
}

// --- Field source classification ---

/// Closed classification of `field_source` tokens. The stored source string
/// stays as-is; rendering dispatches on the classified kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    CompanyPayrollNumber,
    PayrollNumber,
    EmployeeName,
    EmployeeCode,
    EventCode,
    EventDate,
    Amount,
    Quantity,
    Literal,
}

/// Exact identifier tokens are matched first, then the substring markers for
/// date, monetary and duration sources. Anything else resolves to the
/// field's default value.
pub fn classify_source(source: &str) -> FieldKind {
    match source {
        "numero_folha_empresa" | "company_payroll_number" => FieldKind::CompanyPayrollNumber,
        "numero_matricula" | "numero_folha" | "payroll_number" => FieldKind::PayrollNumber,
        "nome_funcionario" => FieldKind::EmployeeName,
        "codigo_funcionario" | "employee_code" => FieldKind::EmployeeCode,
        "codigo_evento" => FieldKind::EventCode,
        s if s.contains("data")
            || s.contains("date")
            || s.contains("dia")
            || s.contains("mes")
            || s.contains("ano") =>
        {
            FieldKind::EventDate
        }
        s if s.contains("valor") || s.contains("value") => FieldKind::Amount,
        s if s.contains("hora") || s.contains("hour") => FieldKind::Quantity,
        _ => FieldKind::Literal,
    }
}

// --- Layout data model ---

/// One output column of an export layout. Field names mirror the record
/// store columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutField {
    pub field_name: String,
    #[serde(default)]
    pub field_source: Option<String>,
    #[serde(default)]
    pub format_pattern: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub order_position: i32,
    pub field_size: usize,
    #[serde(default)]
    pub start_position: Option<usize>,
    #[serde(default)]
    pub end_position: Option<usize>,
    #[serde(default)]
    pub fill_type: FillType,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default)]
    pub decimal_places: u32,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default)]
    pub is_aggregation_field: bool,
}

impl LayoutField {
    pub fn kind(&self) -> FieldKind {
        classify_source(self.field_source.as_deref().unwrap_or(""))
    }
}

fn default_extra_factor() -> Decimal {
    dec!(1.5)
}

fn default_night_factor() -> Decimal {
    dec!(1.2)
}

/// A named export format: ordered fixed-width fields plus separator and
/// factor policy. Header and footer text are stored but not emitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub header_text: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub field_separator: FieldSeparator,
    #[serde(default)]
    pub decimal_separator: DecimalSeparator,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub multiply_extra_factor: bool,
    #[serde(default)]
    pub multiply_night_factor: bool,
    #[serde(default = "default_extra_factor")]
    pub extra_factor: Decimal,
    #[serde(default = "default_night_factor")]
    pub night_factor: Decimal,
    pub fields: Vec<LayoutField>,
}

impl Layout {
    /// Fields in emission order.
    pub fn ordered_fields(&self) -> Vec<&LayoutField> {
        let mut fields: Vec<&LayoutField> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order_position);
        fields
    }

    /// Renumbers order positions gapless from 1 and lays the fields out
    /// contiguously, keeping `end = start + size - 1`. Invoked whenever
    /// field sizes change and after loading, so stored positions can never
    /// drift from the sizes.
    pub fn recalculate_positions(&mut self) {
        self.fields.sort_by_key(|f| f.order_position);
        let mut cursor = 1usize;
        for (index, field) in self.fields.iter_mut().enumerate() {
            field.order_position = index as i32 + 1;
            field.start_position = Some(cursor);
            field.end_position = Some(cursor + field.field_size.saturating_sub(1));
            cursor += field.field_size;
        }
    }

    /// Total line width in characters, ignoring separators.
    pub fn total_width(&self) -> usize {
        self.fields.iter().map(|f| f.field_size).sum()
    }
}
