//! Public entry points: load a CSV, build both documents, and persist them.
//!
//! [`SchemaGenerator`] only carries configuration. Every call to
//! [`SchemaGenerator::generate`] starts from scratch and returns a fresh
//! [`SchemaOutput`], so results from two inputs can never be mixed.

use std::{
    error::Error,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use log::{error, info};
use serde::Serialize;

use crate::{
    builder::{SchemaOutput, build},
    config::InferenceConfig,
    error::{GenerateError, WriteError},
    table::{LoaderOptions, load_table},
};

pub const PARAMETERS_FILE_NAME: &str = "parameters.json";
pub const DATATYPES_FILE_NAME: &str = "column_datatypes.json";

#[derive(Debug, Clone, Default)]
pub struct SchemaGenerator {
    config: InferenceConfig,
    loader: LoaderOptions,
}

impl SchemaGenerator {
    pub fn new(config: InferenceConfig) -> Self {
        let loader = LoaderOptions {
            missing_markers: config.missing_markers.clone(),
            ..LoaderOptions::default()
        };
        Self { config, loader }
    }

    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.loader.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.loader.encoding = encoding;
        self
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Loads `input` and infers its schema. Load and build failures are
    /// logged here and returned as distinct [`GenerateError`] variants.
    pub fn generate(&self, input: &Path) -> Result<SchemaOutput, GenerateError> {
        let table = load_table(input, &self.loader).inspect_err(|err| {
            error!(
                "Caught an error when trying to load input file {input:?}: {}",
                error_chain(err)
            )
        })?;
        let output = build(&table, &self.config).inspect_err(|err| {
            error!(
                "Caught an error when trying to build the schema for {input:?}: {}",
                error_chain(err)
            )
        })?;
        Ok(output)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub parameters: PathBuf,
    pub datatypes: PathBuf,
}

/// Writes `parameters.json` into an existing directory.
pub fn write_parameters(output: &SchemaOutput, directory: &Path) -> Result<PathBuf, WriteError> {
    write_document(&output.parameters, directory, PARAMETERS_FILE_NAME)
}

/// Writes `column_datatypes.json` into an existing directory.
pub fn write_datatypes(output: &SchemaOutput, directory: &Path) -> Result<PathBuf, WriteError> {
    write_document(&output.datatypes, directory, DATATYPES_FILE_NAME)
}

pub fn write_outputs(output: &SchemaOutput, directory: &Path) -> Result<OutputPaths, WriteError> {
    Ok(OutputPaths {
        parameters: write_parameters(output, directory)?,
        datatypes: write_datatypes(output, directory)?,
    })
}

fn write_document<T: Serialize>(
    document: &T,
    directory: &Path,
    file_name: &str,
) -> Result<PathBuf, WriteError> {
    if !directory.is_dir() {
        return Err(WriteError::MissingDirectory(directory.to_path_buf()));
    }
    let path = directory.join(file_name);
    info!("Writing output file {path:?}...");
    let io_failure = |source| WriteError::Io {
        path: path.clone(),
        source,
    };
    let file = File::create(&path).map_err(io_failure)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document).map_err(|source| {
        WriteError::Serialize {
            path: path.clone(),
            source,
        }
    })?;
    writer.write_all(b"\n").map_err(io_failure)?;
    writer.flush().map_err(io_failure)?;
    info!("Done writing {path:?}");
    Ok(path)
}

/// Renders an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, LoadError};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn generate_distinguishes_load_failures() {
        let generator = SchemaGenerator::default();
        let err = generator
            .generate(Path::new("definitely/missing.csv"))
            .unwrap_err();
        assert!(matches!(err, GenerateError::Load(LoadError::NotFound(_))));
    }

    #[test]
    fn generate_then_write_both_documents() {
        let dir = tempdir().expect("temp dir");
        let input = dir.path().join("input.csv");
        fs::write(&input, "id,color\n1,red\n2,blue\n3,red\n").expect("write input");

        let output = SchemaGenerator::default().generate(&input).expect("generate");
        let paths = write_outputs(&output, dir.path()).expect("write outputs");
        assert_eq!(paths.parameters, dir.path().join(PARAMETERS_FILE_NAME));

        let params: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.parameters).unwrap()).unwrap();
        assert_eq!(params["schema"]["color"]["values"], serde_json::json!(["blue", "red"]));
        let dtypes: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.datatypes).unwrap()).unwrap();
        assert_eq!(dtypes["dtype"]["id"], "uint8");
    }

    #[test]
    fn writing_into_missing_directory_fails() {
        let output = SchemaOutput {
            parameters: Default::default(),
            datatypes: Default::default(),
        };
        let err = write_parameters(&output, Path::new("no/such/dir")).unwrap_err();
        assert!(matches!(err, WriteError::MissingDirectory(_)));
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = BuildError::Classify {
            column: "x".to_string(),
            source: crate::error::ClassifyError::EmptyColumn,
        };
        assert_eq!(
            error_chain(&err),
            "column 'x' could not be classified: cannot classify an empty column"
        );
    }
}
