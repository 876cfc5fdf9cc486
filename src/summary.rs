//! Plain-text overview of an inferred schema, one row per column.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{builder::SchemaDocument, classify::Bound};

const HEADERS: [&str; 6] = ["column", "dtype", "kind", "distinct", "min", "max"];

pub fn summary_rows(document: &SchemaDocument) -> Vec<Vec<String>> {
    document
        .iter()
        .map(|(name, schema)| {
            let bound = |value: Option<&Bound>| value.map(Bound::as_display).unwrap_or_default();
            vec![
                name.to_string(),
                schema.dtype.to_string(),
                schema.kind.as_str().to_string(),
                schema.distinct.to_string(),
                bound(schema.min.as_ref()),
                bound(schema.max.as_ref()),
            ]
        })
        .collect()
}

pub fn render_summary(document: &SchemaDocument) -> String {
    let headers = HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    render_table(&headers, &summary_rows(document))
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = single_line(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
