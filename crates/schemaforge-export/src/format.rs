//! Typed cells and their SQL literal rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use schemaforge_core::{Dialect, NullHandling, TypeMapping};
use serde_json::Value;

/// A row value after type resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    /// Numeric text rendered verbatim.
    Number(String),
    Text(String),
    /// ISO-8601 timestamp or date.
    Temporal(String),
    Json(Value),
}

impl Cell {
    /// Type a raw JSON value using the column's resolved mapping.
    pub fn from_json(value: &Value, mapping: &TypeMapping) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(flag) => Cell::Bool(*flag),
            Value::Number(number) if mapping.host_type == "boolean" => {
                Cell::Bool(number.as_f64().is_some_and(|n| n != 0.0))
            }
            Value::Number(number) => Cell::Number(number.to_string()),
            Value::String(text) if mapping.is_temporal() => Cell::Temporal(normalize_temporal(text)),
            Value::String(text) if mapping.is_numeric() && text.parse::<f64>().is_ok() => {
                Cell::Number(text.clone())
            }
            Value::String(text) => Cell::Text(text.clone()),
            Value::Array(_) | Value::Object(_) => Cell::Json(value.clone()),
        }
    }

    /// Source text used by masking to detect unchanged values.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Bool(flag) => Some(flag.to_string()),
            Cell::Number(text) | Cell::Text(text) | Cell::Temporal(text) => Some(text.clone()),
            Cell::Json(value) => Some(value.to_string()),
        }
    }
}

/// Render timestamps as UTC ISO-8601 with milliseconds; bare dates stay dates.
/// Unparseable text is kept as-is.
pub fn normalize_temporal(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return parsed.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    trimmed.to_string()
}

pub fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// SQL literal for one cell.
pub fn render_cell(cell: &Cell, dialect: Dialect, null_handling: NullHandling) -> String {
    match cell {
        Cell::Null => match null_handling {
            NullHandling::Null => "NULL".to_string(),
            NullHandling::Default => "DEFAULT".to_string(),
            NullHandling::Empty => "''".to_string(),
        },
        Cell::Bool(flag) => match (dialect, flag) {
            (Dialect::Postgres, true) => "true".to_string(),
            (Dialect::Postgres, false) => "false".to_string(),
            (_, true) => "1".to_string(),
            (_, false) => "0".to_string(),
        },
        Cell::Number(text) => text.clone(),
        Cell::Text(text) | Cell::Temporal(text) => quote_string(text),
        Cell::Json(value) => quote_string(&value.to_string()),
    }
}

/// Pad every value to the widest rendered value of its column within the batch.
pub fn align_rows(rows: &mut [Vec<String>]) {
    let Some(first) = rows.first() else {
        return;
    };
    let mut widths = vec![0usize; first.len()];
    for row in rows.iter() {
        for (idx, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(value.chars().count());
            }
        }
    }
    for row in rows.iter_mut() {
        for (idx, value) in row.iter_mut().enumerate() {
            let width = widths.get(idx).copied().unwrap_or(0);
            let pad = width.saturating_sub(value.chars().count());
            value.push_str(&" ".repeat(pad));
        }
    }
}

#[cfg(test)]
mod tests {
    use schemaforge_core::TypeResolver;

    use super::*;

    fn mapping(native: &str, dialect: Dialect) -> TypeMapping {
        TypeResolver::resolve(native, dialect, true)
    }

    #[test]
    fn timestamps_normalize_to_utc_iso() {
        assert_eq!(normalize_temporal("2024-03-01T10:20:30+02:00"), "2024-03-01T08:20:30.000Z");
        assert_eq!(normalize_temporal("2024-03-01 10:20:30"), "2024-03-01T10:20:30.000Z");
        assert_eq!(normalize_temporal("2024-03-01"), "2024-03-01");
        assert_eq!(normalize_temporal("not a date"), "not a date");
    }

    #[test]
    fn null_handling_variants() {
        assert_eq!(render_cell(&Cell::Null, Dialect::Postgres, NullHandling::Null), "NULL");
        assert_eq!(render_cell(&Cell::Null, Dialect::Postgres, NullHandling::Default), "DEFAULT");
        assert_eq!(render_cell(&Cell::Null, Dialect::MySql, NullHandling::Empty), "''");
    }

    #[test]
    fn literals_follow_dialect_and_type() {
        let pg = mapping("boolean", Dialect::Postgres);
        assert_eq!(
            render_cell(&Cell::from_json(&Value::Bool(true), &pg), Dialect::Postgres, NullHandling::Null),
            "true"
        );
        let my = mapping("boolean", Dialect::MySql);
        let cell = Cell::from_json(&Value::from(1), &my);
        assert_eq!(cell, Cell::Bool(true));
        assert_eq!(render_cell(&cell, Dialect::MySql, NullHandling::Null), "1");

        let text = mapping("text", Dialect::Postgres);
        assert_eq!(
            render_cell(&Cell::from_json(&Value::from("O'Brien"), &text), Dialect::Postgres, NullHandling::Null),
            "'O''Brien'"
        );
        let json = mapping("jsonb", Dialect::Postgres);
        let cell = Cell::from_json(&serde_json::json!({"a": 1}), &json);
        assert_eq!(render_cell(&cell, Dialect::Postgres, NullHandling::Null), "'{\"a\":1}'");
    }

    #[test]
    fn alignment_pads_to_widest_value() {
        let mut rows = vec![
            vec!["1".to_string(), "'a'".to_string()],
            vec!["100".to_string(), "'bcd'".to_string()],
        ];
        align_rows(&mut rows);
        assert_eq!(rows[0], vec!["1  ".to_string(), "'a'  ".to_string()]);
        assert_eq!(rows[1], vec!["100".to_string(), "'bcd'".to_string()]);
    }
}
