use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::validate::DocumentKind;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer column types and value domains from CSV files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer a schema from a CSV file and write parameters.json and column_datatypes.json
    Infer(InferArgs),
    /// Check a previously written schema document for structural problems
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory receiving both output documents (created if missing)
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
    /// Largest distinct count that still yields a categorical column
    #[arg(long = "max-categorical")]
    pub max_categorical: Option<usize>,
    /// Keep missing values when classifying and enumerating categories
    #[arg(long = "include-missing")]
    pub include_missing: bool,
    /// Label high-cardinality string columns as 'text' instead of 'id'
    #[arg(long = "include-text-columns")]
    pub include_text_columns: bool,
    /// Widen numeric bounds by this fraction of their range
    #[arg(long = "pad-bounds", value_name = "FRACTION")]
    pub pad_bounds: Option<f64>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file with inference settings; flags override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Print a per-column overview after writing the documents
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("document")
        .required(true)
        .args(["parameters", "datatypes"])
))]
pub struct ValidateArgs {
    /// Schema document to check
    pub file: PathBuf,
    /// Treat the file as a parameters document
    #[arg(short = 'p', long)]
    pub parameters: bool,
    /// Treat the file as a column datatypes document
    #[arg(short = 'd', long)]
    pub datatypes: bool,
}

impl ValidateArgs {
    pub fn document_kind(&self) -> DocumentKind {
        if self.parameters {
            DocumentKind::Parameters
        } else {
            DocumentKind::Datatypes
        }
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("semicolon").unwrap(), b';');
        assert_eq!(parse_delimiter("#").unwrap(), b'#');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn infer_flags_parse() {
        let cli = Cli::try_parse_from([
            "schemagen",
            "infer",
            "-i",
            "data.csv",
            "--max-categorical",
            "5",
            "--pad-bounds",
            "0.05",
            "--delimiter",
            "tab",
        ])
        .expect("parse");
        let Commands::Infer(args) = cli.command else {
            panic!("expected infer");
        };
        assert_eq!(args.max_categorical, Some(5));
        assert_eq!(args.pad_bounds, Some(0.05));
        assert_eq!(args.delimiter, Some(b'\t'));
        assert_eq!(args.output_dir, PathBuf::from("."));
    }

    #[test]
    fn validate_requires_exactly_one_document_kind() {
        assert!(Cli::try_parse_from(["schemagen", "validate", "p.json"]).is_err());
        assert!(Cli::try_parse_from(["schemagen", "validate", "p.json", "-p", "-d"]).is_err());

        let cli = Cli::try_parse_from(["schemagen", "validate", "p.json", "-d"]).expect("parse");
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.document_kind(), DocumentKind::Datatypes);
    }
}
