//! Structural validation of the two persisted documents.
//!
//! Works on raw JSON so hand-edited files can be checked too. Every violation
//! is collected and reported together.

use std::{fs::File, io::BufReader, path::Path};

use serde_json::{Map, Value};

use crate::{
    builder::ColumnKind,
    classify::{Dtype, parse_datetime},
    error::ValidationError,
};

const COLUMN_FIELDS: &[&str] = &["dtype", "kind", "values", "codes", "min", "max", "bins"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Parameters,
    Datatypes,
}

impl DocumentKind {
    fn root_key(self) -> &'static str {
        match self {
            DocumentKind::Parameters => "schema",
            DocumentKind::Datatypes => "dtype",
        }
    }
}

pub fn validate_file(path: &Path, kind: DocumentKind) -> Result<(), ValidationError> {
    let file = File::open(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ValidationError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    validate_document(&document, kind)
}

pub fn validate_document(document: &Value, kind: DocumentKind) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    let root_key = kind.root_key();
    match document.as_object() {
        None => violations.push("document must be a JSON object".to_string()),
        Some(root) => {
            for key in root.keys().filter(|key| key.as_str() != root_key) {
                violations.push(format!("unexpected top-level key '{key}'"));
            }
            match root.get(root_key).and_then(Value::as_object) {
                None => violations.push(format!("missing '{root_key}' object")),
                Some(columns) => {
                    for (name, entry) in columns {
                        let path = format!("{root_key}.{name}");
                        match kind {
                            DocumentKind::Parameters => {
                                check_column_schema(&path, entry, &mut violations)
                            }
                            DocumentKind::Datatypes => {
                                check_dtype(&path, entry, &mut violations);
                            }
                        }
                    }
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Violations(violations))
    }
}

fn check_dtype(path: &str, value: &Value, violations: &mut Vec<String>) -> Option<Dtype> {
    let Some(text) = value.as_str() else {
        violations.push(format!("{path}: dtype must be a string"));
        return None;
    };
    match text.parse::<Dtype>() {
        Ok(dtype) => Some(dtype),
        Err(reason) => {
            violations.push(format!("{path}: {reason}"));
            None
        }
    }
}

fn check_column_schema(path: &str, entry: &Value, violations: &mut Vec<String>) {
    let Some(fields) = entry.as_object() else {
        violations.push(format!("{path}: column entry must be an object"));
        return;
    };
    for key in fields.keys() {
        if !COLUMN_FIELDS.contains(&key.as_str()) {
            violations.push(format!("{path}: unexpected field '{key}'"));
        }
    }

    let dtype = match fields.get("dtype") {
        Some(value) => check_dtype(&format!("{path}.dtype"), value, violations),
        None => {
            violations.push(format!("{path}: missing 'dtype'"));
            None
        }
    };
    let kind = match fields.get("kind").map(|value| value.as_str()) {
        Some(Some(name)) => {
            let kind = ColumnKind::from_name(name);
            if kind.is_none() {
                violations.push(format!("{path}.kind: unknown kind '{name}'"));
            }
            kind
        }
        Some(None) => {
            violations.push(format!("{path}.kind: kind must be a string"));
            None
        }
        None => {
            violations.push(format!("{path}: missing 'kind'"));
            None
        }
    };
    let Some(kind) = kind else {
        return;
    };

    check_presence(path, fields, kind, violations);
    match kind {
        ColumnKind::Categorical => check_categories(path, fields, violations),
        ColumnKind::Numeric => {
            check_numeric_bounds(path, fields, violations);
            if let Some(bins) = fields.get("bins")
                && !bins.as_u64().is_some_and(|bins| bins > 0)
            {
                violations.push(format!("{path}.bins: must be a positive integer"));
            }
            if dtype.is_some_and(|dtype| !dtype.is_numeric()) {
                violations.push(format!("{path}: numeric columns need a numeric dtype"));
            }
        }
        ColumnKind::Date => {
            check_date_bounds(path, fields, violations);
            if dtype.is_some_and(|dtype| dtype != Dtype::Date) {
                violations.push(format!("{path}: date columns need the 'date' dtype"));
            }
        }
        ColumnKind::Id | ColumnKind::Text => {
            if dtype.is_some_and(|dtype| dtype != Dtype::String) {
                violations.push(format!(
                    "{path}: {} columns need the 'string' dtype",
                    kind.as_str()
                ));
            }
        }
    }
}

fn check_presence(
    path: &str,
    fields: &Map<String, Value>,
    kind: ColumnKind,
    violations: &mut Vec<String>,
) {
    let categorical = kind == ColumnKind::Categorical;
    let bounded = matches!(kind, ColumnKind::Numeric | ColumnKind::Date);
    let binned = kind == ColumnKind::Numeric;
    let expectations = [
        ("values", categorical),
        ("codes", categorical),
        ("min", bounded),
        ("max", bounded),
        ("bins", binned),
    ];
    for (field, expected) in expectations {
        let present = fields.contains_key(field);
        if expected && !present {
            violations.push(format!(
                "{path}: '{}' columns require '{field}'",
                kind.as_str()
            ));
        } else if !expected && present {
            violations.push(format!(
                "{path}: '{field}' is not allowed on '{}' columns",
                kind.as_str()
            ));
        }
    }
}

fn check_categories(path: &str, fields: &Map<String, Value>, violations: &mut Vec<String>) {
    let values = fields.get("values").and_then(Value::as_array);
    let codes = fields.get("codes").and_then(Value::as_array);
    if fields.contains_key("values") && values.is_none() {
        violations.push(format!("{path}.values: must be an array"));
    }
    if fields.contains_key("codes") && codes.is_none() {
        violations.push(format!("{path}.codes: must be an array"));
    }
    let (Some(values), Some(codes)) = (values, codes) else {
        return;
    };
    if values.len() != codes.len() {
        violations.push(format!(
            "{path}: {} value(s) but {} code(s)",
            values.len(),
            codes.len()
        ));
    }
    let sequential = codes
        .iter()
        .enumerate()
        .all(|(idx, code)| code.as_u64() == Some(idx as u64 + 1));
    if !sequential {
        violations.push(format!("{path}.codes: must be 1, 2, ..., N"));
    }
}

fn check_numeric_bounds(path: &str, fields: &Map<String, Value>, violations: &mut Vec<String>) {
    let min = fields.get("min");
    let max = fields.get("max");
    for (name, bound) in [("min", min), ("max", max)] {
        if let Some(value) = bound
            && !value.is_number()
        {
            violations.push(format!("{path}.{name}: must be a number"));
        }
    }
    if let (Some(lo), Some(hi)) = (
        min.and_then(Value::as_f64),
        max.and_then(Value::as_f64),
    ) && lo > hi
    {
        violations.push(format!("{path}: min {lo} exceeds max {hi}"));
    }
}

fn check_date_bounds(path: &str, fields: &Map<String, Value>, violations: &mut Vec<String>) {
    let parse = |name: &str| {
        fields
            .get(name)
            .map(|value| value.as_str().and_then(parse_datetime))
    };
    let min = parse("min");
    let max = parse("max");
    for (name, bound) in [("min", min), ("max", max)] {
        if let Some(None) = bound {
            violations.push(format!("{path}.{name}: must be a date-time string"));
        }
    }
    if let (Some(Some(lo)), Some(Some(hi))) = (min, max)
        && lo > hi
    {
        violations.push(format!("{path}: min is later than max"));
    }
}
