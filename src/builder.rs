//! Schema builder: per-column kind policy and output document assembly.
//!
//! For every column, in table order, the builder optionally drops missing
//! entries, classifies the remaining values, counts distinct values, and picks
//! a [`ColumnKind`]:
//!
//! - distinct count ≤ `max_categorical_cardinality` → `categorical`, with
//!   sorted `values` and 1-based `codes`
//! - high-cardinality `string` → `id` (or `text` when text columns are enabled)
//! - high-cardinality `date` → `date` with `min`/`max`
//! - anything else → `numeric` with `min`/`max` and a `bins` suggestion
//!
//! The builder holds no state between calls. Both documents come back
//! together from a single [`build`] call, or not at all.

use std::{borrow::Cow, cmp::Ordering, collections::HashSet};

use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    classify::{Bound, Bounds, Dtype, classify},
    config::{BoundsPadding, InferenceConfig},
    error::BuildError,
    table::{CANONICAL_DATETIME_FORMAT, Column, Scalar, Table},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Numeric,
    Id,
    Date,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Categorical => "categorical",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Id => "id",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "categorical" => Some(ColumnKind::Categorical),
            "numeric" => Some(ColumnKind::Numeric),
            "id" => Some(ColumnKind::Id),
            "date" => Some(ColumnKind::Date),
            "text" => Some(ColumnKind::Text),
            _ => None,
        }
    }
}

/// Schema entry for one column.
///
/// `values`/`codes` are only set for categorical columns, `min`/`max` only for
/// numeric and date columns, and `bins` only for numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub dtype: Dtype,
    pub kind: ColumnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Scalar>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codes: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<u32>,
    #[serde(skip)]
    pub distinct: usize,
}

impl ColumnSchema {
    fn categorical(dtype: Dtype, values: Vec<Scalar>) -> Self {
        let codes = (1..=values.len() as u32).collect();
        Self {
            dtype,
            kind: ColumnKind::Categorical,
            distinct: values.len(),
            values: Some(values),
            codes: Some(codes),
            min: None,
            max: None,
            bins: None,
        }
    }

    fn unbounded(dtype: Dtype, kind: ColumnKind, distinct: usize) -> Self {
        Self {
            dtype,
            kind,
            values: None,
            codes: None,
            min: None,
            max: None,
            bins: None,
            distinct,
        }
    }

    fn ranged(
        dtype: Dtype,
        kind: ColumnKind,
        bounds: Option<Bounds>,
        bins: Option<u32>,
        distinct: usize,
    ) -> Self {
        Self {
            dtype,
            kind,
            values: None,
            codes: None,
            min: bounds.map(|b| b.min),
            max: bounds.map(|b| b.max),
            bins,
            distinct,
        }
    }
}

/// `{"schema": {<column>: <ColumnSchema>, ...}}`, in table column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    columns: Vec<(String, ColumnSchema)>,
}

impl SchemaDocument {
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, schema)| schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnSchema)> {
        self.columns
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// `{"dtype": {<column>: <dtype>, ...}}`, the dtype-only projection of
/// [`SchemaDocument`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatatypeDocument {
    columns: Vec<(String, Dtype)>,
}

impl DatatypeDocument {
    pub fn get(&self, name: &str) -> Option<Dtype> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, dtype)| *dtype)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Dtype)> {
        self.columns
            .iter()
            .map(|(name, dtype)| (name.as_str(), *dtype))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

struct OrderedEntries<'a, V>(&'a [(String, V)]);

impl<V: Serialize> Serialize for OrderedEntries<'_, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn serialize_wrapped<S, V>(
    serializer: S,
    key: &str,
    entries: &[(String, V)],
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, &OrderedEntries(entries))?;
    map.end()
}

impl Serialize for SchemaDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_wrapped(serializer, "schema", &self.columns)
    }
}

impl Serialize for DatatypeDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_wrapped(serializer, "dtype", &self.columns)
    }
}

/// Result of one inference run.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOutput {
    pub parameters: SchemaDocument,
    pub datatypes: DatatypeDocument,
}

pub fn build(table: &Table, config: &InferenceConfig) -> Result<SchemaOutput, BuildError> {
    if config.include_missing {
        info!("Building schema...");
    } else {
        info!("Building schema without missing values...");
    }
    check_table_shape(table)?;

    let mut parameters = Vec::with_capacity(table.columns.len());
    let mut datatypes = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let schema = build_column(column, config)?;
        datatypes.push((column.name.clone(), schema.dtype));
        parameters.push((column.name.clone(), schema));
    }

    info!("Schema building successful ({} column(s))", parameters.len());
    Ok(SchemaOutput {
        parameters: SchemaDocument {
            columns: parameters,
        },
        datatypes: DatatypeDocument { columns: datatypes },
    })
}

fn check_table_shape(table: &Table) -> Result<(), BuildError> {
    let expected = table.row_count();
    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(BuildError::DuplicateColumn {
                column: column.name.clone(),
            });
        }
        if column.values.len() != expected {
            return Err(BuildError::RaggedColumn {
                column: column.name.clone(),
                expected,
                actual: column.values.len(),
            });
        }
    }
    Ok(())
}

pub fn build_column(column: &Column, config: &InferenceConfig) -> Result<ColumnSchema, BuildError> {
    let values: Cow<'_, [Scalar]> = if config.include_missing {
        Cow::Borrowed(&column.values)
    } else {
        debug!(
            "Removing {} missing value(s) from column '{}'",
            column.missing_count(),
            column.name
        );
        Cow::Owned(
            column
                .values
                .iter()
                .filter(|value| !value.is_missing())
                .cloned()
                .collect(),
        )
    };

    if values.is_empty() {
        warn!(
            "Column '{}' has no values to classify; recording it as an empty categorical string column",
            column.name
        );
        return Ok(ColumnSchema::categorical(Dtype::String, Vec::new()));
    }

    let classification = classify(&values).map_err(|source| BuildError::Classify {
        column: column.name.clone(),
        source,
    })?;
    let dtype = classification.dtype;
    let distinct = distinct_values(&values, dtype);
    let kind = decide_kind(distinct.len(), dtype, config);
    debug!(
        "Column '{}': dtype {dtype}, {} distinct value(s), kind {}",
        column.name,
        distinct.len(),
        kind.as_str()
    );

    let schema = match kind {
        ColumnKind::Categorical => {
            let mut categories = distinct;
            if sort_categories(&mut categories) == SortOutcome::EncounterOrder {
                warn!(
                    "Values for column '{}' cannot be totally ordered; keeping first-seen order",
                    column.name
                );
            }
            ColumnSchema::categorical(dtype, categories)
        }
        ColumnKind::Id | ColumnKind::Text => {
            warn!(
                "Not using values for column '{}' because it is non-numeric and has more than {} distinct values; labelling it '{}'",
                column.name,
                config.max_categorical_cardinality,
                kind.as_str()
            );
            ColumnSchema::unbounded(dtype, kind, distinct.len())
        }
        ColumnKind::Date => {
            ColumnSchema::ranged(dtype, kind, classification.bounds, None, distinct.len())
        }
        ColumnKind::Numeric => {
            let bounds = classification
                .bounds
                .map(|bounds| pad_bounds(bounds, dtype, config.bounds_padding));
            ColumnSchema::ranged(
                dtype,
                kind,
                bounds,
                Some(config.histogram_bins),
                distinct.len(),
            )
        }
    };
    Ok(schema)
}

pub fn decide_kind(distinct: usize, dtype: Dtype, config: &InferenceConfig) -> ColumnKind {
    if distinct <= config.max_categorical_cardinality {
        return ColumnKind::Categorical;
    }
    match dtype {
        Dtype::String if config.include_text_columns => ColumnKind::Text,
        Dtype::String => ColumnKind::Id,
        Dtype::Date => ColumnKind::Date,
        _ => ColumnKind::Numeric,
    }
}

/// Distinct values in first-seen order. Float columns widen their integer
/// cells first so `1` and `1.0` are one value, and string columns render every
/// present cell as text so the values sort lexically.
fn distinct_values(values: &[Scalar], dtype: Dtype) -> Vec<Scalar> {
    let widened: Cow<'_, [Scalar]> = match dtype {
        Dtype::Float => Cow::Owned(
            values
                .iter()
                .map(|value| match value {
                    Scalar::Integer(i) => Scalar::Float(*i as f64),
                    other => other.clone(),
                })
                .collect(),
        ),
        Dtype::String => Cow::Owned(values.iter().map(as_text).collect()),
        _ => Cow::Borrowed(values),
    };
    widened
        .iter()
        .map(|value| (value.key(), value))
        .unique_by(|(key, _)| *key)
        .map(|(_, value)| value.clone())
        .collect()
}

fn as_text(value: &Scalar) -> Scalar {
    match value {
        Scalar::Integer(i) => Scalar::String(i.to_string()),
        Scalar::Float(f) => Scalar::String(f.to_string()),
        Scalar::Date(d) => Scalar::String(d.format(CANONICAL_DATETIME_FORMAT).to_string()),
        Scalar::String(_) | Scalar::Missing => value.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueFamily {
    Numeric,
    Text,
    Date,
}

impl ValueFamily {
    fn of(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Integer(_) | Scalar::Float(_) => Some(ValueFamily::Numeric),
            Scalar::String(_) => Some(ValueFamily::Text),
            Scalar::Date(_) => Some(ValueFamily::Date),
            Scalar::Missing => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOutcome {
    Sorted,
    EncounterOrder,
}

/// Sorts numerically, lexically, or chronologically when every present value
/// shares one family; missing entries go last. Mixed families are left in
/// first-seen order.
fn sort_categories(values: &mut [Scalar]) -> SortOutcome {
    let mut families = values.iter().filter_map(ValueFamily::of);
    if let Some(first) = families.next()
        && !families.all(|family| family == first)
    {
        return SortOutcome::EncounterOrder;
    }
    values.sort_by(compare_same_family);
    SortOutcome::Sorted
}

fn compare_same_family(a: &Scalar, b: &Scalar) -> Ordering {
    match (a, b) {
        (Scalar::Missing, Scalar::Missing) => Ordering::Equal,
        (Scalar::Missing, _) => Ordering::Greater,
        (_, Scalar::Missing) => Ordering::Less,
        (Scalar::Integer(x), Scalar::Integer(y)) => x.cmp(y),
        (Scalar::String(x), Scalar::String(y)) => x.cmp(y),
        (Scalar::Date(x), Scalar::Date(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            // unreachable once families have been checked
            _ => Ordering::Equal,
        },
    }
}

/// Applies the configured presentation margin to numeric bounds.
///
/// Integer margins round up to whole numbers, a non-negative minimum never
/// drops below zero, and integer bounds stay inside the dtype's range.
pub fn pad_bounds(bounds: Bounds, dtype: Dtype, padding: BoundsPadding) -> Bounds {
    let BoundsPadding::RangeFraction(fraction) = padding else {
        return bounds;
    };
    match (bounds.min, bounds.max) {
        (Bound::Integer(min), Bound::Integer(max)) => {
            let span = (max - min) as f64;
            let pad = (span * fraction).ceil() as i128;
            let mut lo = min - pad;
            let mut hi = max + pad;
            if min >= 0 {
                lo = lo.max(0);
            }
            if let Some((floor, ceiling)) = dtype.integer_range() {
                lo = lo.max(floor);
                hi = hi.min(ceiling);
            }
            Bounds {
                min: Bound::Integer(lo),
                max: Bound::Integer(hi),
            }
        }
        (Bound::Float(min), Bound::Float(max)) => {
            let pad = (max - min) * fraction;
            let lo = if min >= 0.0 {
                (min - pad).max(0.0)
            } else {
                min - pad
            };
            Bounds {
                min: Bound::Float(lo),
                max: Bound::Float(max + pad),
            }
        }
        _ => bounds,
    }
}
