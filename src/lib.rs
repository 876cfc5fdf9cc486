pub mod builder;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod io_utils;
pub mod summary;
pub mod table;
pub mod validate;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, InferArgs, ValidateArgs},
    config::{BoundsPadding, InferenceConfig},
    generator::{SchemaGenerator, error_chain, write_outputs},
    validate::{DocumentKind, validate_file},
};

pub use crate::{
    builder::{ColumnKind, ColumnSchema, DatatypeDocument, SchemaDocument, SchemaOutput},
    classify::{Classification, Dtype, classify},
    error::{BuildError, ClassifyError, GenerateError, LoadError, ValidationError, WriteError},
    table::{Column, Scalar, Table},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("schemagen", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Infer(args) => handle_infer(&args),
        Commands::Validate(args) => handle_validate(&args),
    }
}

fn handle_infer(args: &InferArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref()).ok_or_else(|| {
        anyhow!(
            "Unknown input encoding '{}'",
            args.input_encoding.as_deref().unwrap_or_default()
        )
    })?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Inferring schema for '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let generator = SchemaGenerator::new(config)
        .with_delimiter(Some(delimiter))
        .with_encoding(encoding);
    debug!("Inference settings: {:?}", generator.config());
    let output = generator
        .generate(&args.input)
        .with_context(|| format!("Inferring schema from {:?}", args.input))?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Creating output directory {:?}", args.output_dir))?;
    let paths = write_outputs(&output, &args.output_dir)
        .with_context(|| format!("Writing schema documents to {:?}", args.output_dir))?;

    for (path, kind) in [
        (&paths.parameters, DocumentKind::Parameters),
        (&paths.datatypes, DocumentKind::Datatypes),
    ] {
        if let Err(err) = validate_file(path, kind) {
            warn!("Written document {path:?} failed validation: {}", error_chain(&err));
        }
    }

    info!(
        "Schema for {} column(s) written to {:?} and {:?}",
        output.parameters.len(),
        paths.parameters,
        paths.datatypes
    );
    if args.summary {
        print!("{}", summary::render_summary(&output.parameters));
    }
    Ok(())
}

fn resolve_config(args: &InferArgs) -> Result<InferenceConfig> {
    let mut config = match &args.config {
        Some(path) => InferenceConfig::load(path)
            .with_context(|| format!("Loading inference settings from {path:?}"))?,
        None => InferenceConfig::default(),
    };
    if let Some(limit) = args.max_categorical {
        config.max_categorical_cardinality = limit;
    }
    if args.include_missing {
        config.include_missing = true;
    }
    if args.include_text_columns {
        config.include_text_columns = true;
    }
    if let Some(fraction) = args.pad_bounds {
        config.bounds_padding = BoundsPadding::RangeFraction(fraction);
    }
    config.validate().context("Validating inference settings")?;
    Ok(config)
}

fn handle_validate(args: &ValidateArgs) -> Result<()> {
    let kind = args.document_kind();
    validate_file(&args.file, kind)
        .with_context(|| format!("Validating {:?}", args.file))?;
    info!("{:?} is a valid {kind:?} document", args.file);
    println!("{}: ok", args.file.display());
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
