//! Column classifier: narrowest storage datatype plus value bounds.
//!
//! Detection is a priority chain. Each detector is a pure function that either
//! returns a confident [`Classification`] or `None` when it does not apply to
//! every value in the column; the first detector that applies wins:
//!
//! 1. integer: every value is an integer. Picks the narrowest unsigned width
//!    (8/16/32/64 bits) when the minimum is non-negative, otherwise the
//!    narrowest signed width holding both extremes.
//! 2. float: every value is numeric, allowing retained missing entries. A
//!    column holding only missing entries is float with no bounds.
//! 3. date: every non-missing value parses as a calendar date or date-time.
//! 4. string: the fallback, with no bounds.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::trace;
use serde::{Serialize, Serializer};

use crate::{
    error::ClassifyError,
    table::{CANONICAL_DATETIME_FORMAT, Scalar},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub const ALL: [IntWidth; 4] = [IntWidth::W8, IntWidth::W16, IntWidth::W32, IntWidth::W64];

    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    pub fn unsigned_max(self) -> u64 {
        match self {
            IntWidth::W8 => u8::MAX as u64,
            IntWidth::W16 => u16::MAX as u64,
            IntWidth::W32 => u32::MAX as u64,
            IntWidth::W64 => u64::MAX,
        }
    }

    pub fn signed_range(self) -> (i64, i64) {
        match self {
            IntWidth::W8 => (i8::MIN as i64, i8::MAX as i64),
            IntWidth::W16 => (i16::MIN as i64, i16::MAX as i64),
            IntWidth::W32 => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::W64 => (i64::MIN, i64::MAX),
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        IntWidth::ALL.into_iter().find(|width| width.bits() == bits)
    }
}

/// Storage datatype tag written to both output documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Unsigned(IntWidth),
    Signed(IntWidth),
    Float,
    Date,
    String,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Unsigned(IntWidth::W8) => "uint8",
            Dtype::Unsigned(IntWidth::W16) => "uint16",
            Dtype::Unsigned(IntWidth::W32) => "uint32",
            Dtype::Unsigned(IntWidth::W64) => "uint64",
            Dtype::Signed(IntWidth::W8) => "int8",
            Dtype::Signed(IntWidth::W16) => "int16",
            Dtype::Signed(IntWidth::W32) => "int32",
            Dtype::Signed(IntWidth::W64) => "int64",
            Dtype::Float => "float",
            Dtype::Date => "date",
            Dtype::String => "string",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Dtype::Unsigned(_) | Dtype::Signed(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Dtype::Float)
    }

    /// Inclusive value range representable by an integer dtype.
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        match self {
            Dtype::Unsigned(width) => Some((0, width.unsigned_max() as i128)),
            Dtype::Signed(width) => {
                let (lo, hi) = width.signed_range();
                Some((lo as i128, hi as i128))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dtype {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "float" => return Ok(Dtype::Float),
            "date" => return Ok(Dtype::Date),
            "string" => return Ok(Dtype::String),
            _ => {}
        }
        let (unsigned, digits) = match value.strip_prefix("uint") {
            Some(rest) => (true, rest),
            None => match value.strip_prefix("int") {
                Some(rest) => (false, rest),
                None => return Err(format!("unknown dtype '{value}'")),
            },
        };
        let width = digits
            .parse::<u32>()
            .ok()
            .and_then(IntWidth::from_bits)
            .ok_or_else(|| format!("unknown dtype '{value}'"))?;
        Ok(if unsigned {
            Dtype::Unsigned(width)
        } else {
            Dtype::Signed(width)
        })
    }
}

impl Serialize for Dtype {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A column extreme. Dates render as `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Integer(i128),
    Float(f64),
    Date(NaiveDateTime),
}

impl Bound {
    pub fn as_display(&self) -> String {
        match self {
            Bound::Integer(i) => i.to_string(),
            Bound::Float(f) => f.to_string(),
            Bound::Date(d) => d.format(CANONICAL_DATETIME_FORMAT).to_string(),
        }
    }
}

impl Serialize for Bound {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Bound::Integer(i) => serializer.serialize_i128(*i),
            Bound::Float(f) => serializer.serialize_f64(*f),
            Bound::Date(d) => serializer.collect_str(&d.format(CANONICAL_DATETIME_FORMAT)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Bound,
    pub max: Bound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub dtype: Dtype,
    pub bounds: Option<Bounds>,
}

impl Classification {
    fn string() -> Self {
        Self {
            dtype: Dtype::String,
            bounds: None,
        }
    }
}

type Detector = fn(&[Scalar]) -> Option<Classification>;

const DETECTORS: &[(&str, Detector)] = &[
    ("integer", detect_integer),
    ("float", detect_float),
    ("date", detect_date),
];

/// Classifies one column. The slice must be non-empty.
pub fn classify(values: &[Scalar]) -> Result<Classification, ClassifyError> {
    if values.is_empty() {
        return Err(ClassifyError::EmptyColumn);
    }
    let classification = DETECTORS
        .iter()
        .find_map(|(name, detector)| {
            let outcome = detector(values);
            if outcome.is_none() {
                trace!("{name} detector does not apply");
            }
            outcome
        })
        .unwrap_or_else(Classification::string);
    Ok(classification)
}

/// Narrowest conventional integer dtype able to hold both `min` and `max`,
/// or `None` when no 64-bit dtype can.
pub fn narrowest_integer_dtype(min: i128, max: i128) -> Option<Dtype> {
    if min >= 0 {
        IntWidth::ALL
            .into_iter()
            .find(|width| max <= width.unsigned_max() as i128)
            .map(Dtype::Unsigned)
    } else {
        IntWidth::ALL
            .into_iter()
            .find(|width| {
                let (lo, hi) = width.signed_range();
                min >= lo as i128 && max <= hi as i128
            })
            .map(Dtype::Signed)
    }
}

fn detect_integer(values: &[Scalar]) -> Option<Classification> {
    let mut extremes: Option<(i128, i128)> = None;
    for value in values {
        let Scalar::Integer(i) = value else {
            return None;
        };
        extremes = Some(match extremes {
            Some((min, max)) => (min.min(*i), max.max(*i)),
            None => (*i, *i),
        });
    }
    let (min, max) = extremes?;
    Some(Classification {
        dtype: narrowest_integer_dtype(min, max)?,
        bounds: Some(Bounds {
            min: Bound::Integer(min),
            max: Bound::Integer(max),
        }),
    })
}

fn detect_float(values: &[Scalar]) -> Option<Classification> {
    let mut extremes: Option<(f64, f64)> = None;
    for value in values {
        if value.is_missing() {
            continue;
        }
        let f = value.as_f64()?;
        extremes = Some(match extremes {
            Some((min, max)) => (min.min(f), max.max(f)),
            None => (f, f),
        });
    }
    // a column of nothing but retained missing entries is still float
    Some(Classification {
        dtype: Dtype::Float,
        bounds: extremes.map(|(min, max)| Bounds {
            min: Bound::Float(min),
            max: Bound::Float(max),
        }),
    })
}

fn detect_date(values: &[Scalar]) -> Option<Classification> {
    let mut extremes: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for value in values {
        let parsed = match value {
            Scalar::Missing => continue,
            Scalar::Date(d) => *d,
            Scalar::String(s) => parse_datetime(s)?,
            Scalar::Integer(_) | Scalar::Float(_) => return None,
        };
        extremes = Some(match extremes {
            Some((min, max)) => (min.min(parsed), max.max(parsed)),
            None => (parsed, parsed),
        });
    }
    let (min, max) = extremes?;
    Some(Classification {
        dtype: Dtype::Date,
        bounds: Some(Bounds {
            min: Bound::Date(min),
            max: Bound::Date(max),
        }),
    })
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Permissive date/time parser. Dates without a time resolve to midnight and
/// zoned timestamps are normalised to UTC.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
