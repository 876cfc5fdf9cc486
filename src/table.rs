//! In-memory table model and the CSV loader that produces it.
//!
//! The loader owns everything that happens before inference: delimiter and
//! encoding handling, missing-marker recognition, per-column typing, and the
//! disambiguation of duplicate or blank header names. The schema builder only
//! ever sees a [`Table`] whose column names are already unique.

use std::{
    collections::{HashMap, HashSet},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use serde::{Serialize, Serializer};

use crate::{error::LoadError, io_utils};

pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One cell of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Any integer a 64-bit signed or unsigned dtype can hold.
    Integer(i128),
    Float(f64),
    String(String),
    Date(NaiveDateTime),
    Missing,
}

/// Hashable identity of a [`Scalar`], used for distinct-value counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKey<'a> {
    Integer(i128),
    Float(u64),
    String(&'a str),
    Date(NaiveDateTime),
    Missing,
}

impl Scalar {
    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }

    pub fn key(&self) -> ScalarKey<'_> {
        match self {
            Scalar::Integer(i) => ScalarKey::Integer(*i),
            // -0.0 and 0.0 are the same category
            Scalar::Float(f) if *f == 0.0 => ScalarKey::Float(0.0f64.to_bits()),
            Scalar::Float(f) => ScalarKey::Float(f.to_bits()),
            Scalar::String(s) => ScalarKey::String(s),
            Scalar::Date(d) => ScalarKey::Date(*d),
            Scalar::Missing => ScalarKey::Missing,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Scalar::Integer(i) => serializer.serialize_i128(*i),
            Scalar::Float(f) => serializer.serialize_f64(*f),
            Scalar::String(s) => serializer.serialize_str(s),
            Scalar::Date(d) => {
                serializer.collect_str(&d.format(CANONICAL_DATETIME_FORMAT))
            }
            Scalar::Missing => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn from_integers(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(
            name,
            values
                .into_iter()
                .map(|value| Scalar::Integer(value.into()))
                .collect(),
        )
    }

    pub fn from_strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            values
                .into_iter()
                .map(|value| Scalar::String(value.into()))
                .collect(),
        )
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_missing()).count()
    }
}

/// An ordered sequence of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .map(|column| column.values.len())
            .unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub missing_markers: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            missing_markers: DEFAULT_MISSING_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }
}

impl LoaderOptions {
    fn is_missing_marker(&self, trimmed: &str) -> bool {
        trimmed.is_empty() || self.missing_markers.iter().any(|marker| marker == trimmed)
    }
}

pub fn load_table(path: &Path, options: &LoaderOptions) -> Result<Table, LoadError> {
    info!("Reading CSV file {path:?}");
    let metadata = fs::metadata(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    })?;
    if metadata.len() == 0 {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let header_record = reader
        .byte_headers()
        .map_err(|err| csv_failure(path, err))?
        .clone();
    if header_record.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    let raw_headers = io_utils::decode_record(&header_record, options.encoding)
        .map_err(|reason| malformed(path, reason))?;
    let headers = disambiguate_headers(raw_headers);

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut record = csv::ByteRecord::new();
    let mut row_idx = 0usize;
    while reader
        .read_byte_record(&mut record)
        .map_err(|err| csv_failure(path, err))?
    {
        row_idx += 1;
        let decoded = io_utils::decode_record(&record, options.encoding)
            .map_err(|reason| malformed(path, format!("row {}: {reason}", row_idx + 1)))?;
        for (column, raw) in cells.iter_mut().zip(decoded) {
            column.push(raw);
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| Column::new(name, parse_column(raw, options)))
        .collect();

    info!(
        "Successfully read {} row(s) across {} column(s)",
        row_idx,
        columns.len()
    );
    Ok(Table::new(columns))
}

/// Types one column as a whole. Cells are typed individually first; if any
/// present cell is text, every present cell keeps its raw text so the column
/// stays homogeneous.
pub fn parse_column(raw: Vec<String>, options: &LoaderOptions) -> Vec<Scalar> {
    let typed: Vec<Scalar> = raw.iter().map(|cell| parse_cell(cell, options)).collect();
    if !typed.iter().any(|value| matches!(value, Scalar::String(_))) {
        return typed;
    }
    raw.into_iter()
        .zip(typed)
        .map(|(cell, value)| match value {
            Scalar::Missing => Scalar::Missing,
            _ => Scalar::String(cell),
        })
        .collect()
}

/// Types one cell. Surrounding whitespace is ignored when recognising missing
/// markers and numbers, but text cells are stored verbatim.
pub fn parse_cell(raw: &str, options: &LoaderOptions) -> Scalar {
    let trimmed = raw.trim();
    if options.is_missing_marker(trimmed) {
        return Scalar::Missing;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Scalar::Integer(parsed.into());
    }
    if let Ok(parsed) = trimmed.parse::<u64>() {
        return Scalar::Integer(parsed.into());
    }
    if let Ok(parsed) = trimmed.parse::<f64>()
        && parsed.is_finite()
    {
        return Scalar::Float(parsed);
    }
    Scalar::String(raw.to_string())
}

/// Renames repeated headers to `name.1`, `name.2`, ... and blank headers to
/// `Unnamed: <position>`, never producing a name that already exists.
pub fn disambiguate_headers(headers: Vec<String>) -> Vec<String> {
    let headers: Vec<String> = headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let trimmed = header.trim();
            if trimmed.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        let count = counts.entry(header.clone()).or_insert(0);
        if *count == 0 {
            *count = 1;
            result.push(header);
            continue;
        }
        let mut candidate = format!("{header}.{count}");
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{header}.{count}");
        }
        *count += 1;
        debug!("Renaming duplicate column '{header}' to '{candidate}'");
        taken.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

fn csv_failure(path: &Path, err: csv::Error) -> LoadError {
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => malformed(path, reason),
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> LoadError {
    LoadError::Malformed {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}
