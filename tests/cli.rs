mod common;

use assert_cmd::Command;
use predicates::{prelude::*, str::contains};
use serde_json::json;

use common::{TestWorkspace, fixture_path};

fn schemagen() -> Command {
    Command::cargo_bin("schemagen").expect("binary exists")
}

#[test]
fn infer_writes_both_documents_for_reference_fixture() {
    let workspace = TestWorkspace::new();
    let input = fixture_path("valid_input_data.csv");
    let out_dir = workspace.path().join("out");

    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            out_dir.to_str().unwrap(),
            "--include-text-columns",
            "--pad-bounds",
            "0.05",
        ])
        .assert()
        .success();

    let params = workspace.read_json("out/parameters.json");
    assert_eq!(
        params,
        json!({
            "schema": {
                "A": {"dtype": "uint8", "kind": "categorical", "values": [1, 2, 3, 4, 5], "codes": [1, 2, 3, 4, 5]},
                "B": {"dtype": "uint32", "kind": "numeric", "min": 999997, "max": 1000052, "bins": 10},
                "C": {"dtype": "string", "kind": "categorical", "values": ["A", "B", "C", "D", "E"], "codes": [1, 2, 3, 4, 5]},
                "D": {"dtype": "string", "kind": "text"}
            }
        })
    );
    let dtypes = workspace.read_json("out/column_datatypes.json");
    assert_eq!(
        dtypes,
        json!({"dtype": {"A": "uint8", "B": "uint32", "C": "string", "D": "string"}})
    );
}

#[test]
fn infer_keeps_missing_values_when_requested() {
    let workspace = TestWorkspace::new();
    let input = fixture_path("valid_input_data.csv");

    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().to_str().unwrap(),
            "--include-missing",
        ])
        .assert()
        .success();

    let params = workspace.read_json("parameters.json");
    assert_eq!(params["schema"]["A"]["dtype"], "float");
    assert_eq!(
        params["schema"]["A"]["values"],
        json!([1.0, 2.0, 3.0, 4.0, 5.0, null])
    );
    assert_eq!(params["schema"]["A"]["codes"], json!([1, 2, 3, 4, 5, 6]));
    assert_eq!(params["schema"]["B"]["min"], 1000000);
    assert_eq!(params["schema"]["D"]["kind"], "id");
}

#[test]
fn infer_reads_settings_file_and_flags_override_it() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "settings.yaml",
        "max_categorical_cardinality: 3\ninclude_text_columns: true\n",
    );
    let input = workspace.write("input.csv", "code,size\nx,1\ny,2\nz,3\nw,4\n");

    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--max-categorical",
            "4",
        ])
        .assert()
        .success();

    let params = workspace.read_json("parameters.json");
    assert_eq!(params["schema"]["code"]["kind"], "categorical");
    assert_eq!(params["schema"]["size"]["values"], json!([1, 2, 3, 4]));
}

#[test]
fn infer_summary_prints_column_overview() {
    let workspace = TestWorkspace::new();
    let input = fixture_path("valid_input_data.csv");

    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().to_str().unwrap(),
            "--summary",
        ])
        .assert()
        .success()
        .stdout(contains("column").and(contains("distinct")))
        .stdout(contains("uint32").and(contains("1000049")));
}

#[test]
fn infer_handles_semicolon_delimited_input() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("input.csv", "a;b\n1;x\n2;y\n");

    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().to_str().unwrap(),
            "--delimiter",
            ";",
        ])
        .assert()
        .success();

    let dtypes = workspace.read_json("column_datatypes.json");
    assert_eq!(dtypes, json!({"dtype": {"a": "uint8", "b": "string"}}));
}

#[test]
fn infer_reports_load_failures() {
    let workspace = TestWorkspace::new();
    let out = workspace.path().to_str().unwrap();

    schemagen()
        .args(["infer", "-i", "does/not/exist.csv", "-o", out])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("was not found")));

    let empty = fixture_path("empty_input_data.csv");
    schemagen()
        .args(["infer", "-i", empty.to_str().unwrap(), "-o", out])
        .assert()
        .failure()
        .stderr(contains("is empty"));

    let ragged = fixture_path("invalid_input_data.csv");
    schemagen()
        .args(["infer", "-i", ragged.to_str().unwrap(), "-o", out])
        .assert()
        .failure()
        .stderr(contains("not valid delimited data"));

    assert!(!workspace.path().join("parameters.json").exists());
}

#[test]
fn infer_rejects_unknown_encoding() {
    let input = fixture_path("valid_input_data.csv");
    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "--input-encoding",
            "not-an-encoding",
        ])
        .assert()
        .failure()
        .stderr(contains("Unknown input encoding"));
}

#[test]
fn validate_accepts_written_documents_and_rejects_broken_ones() {
    let workspace = TestWorkspace::new();
    let input = fixture_path("valid_input_data.csv");
    schemagen()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    let params = workspace.path().join("parameters.json");
    let dtypes = workspace.path().join("column_datatypes.json");
    schemagen()
        .args(["validate", params.to_str().unwrap(), "--parameters"])
        .assert()
        .success()
        .stdout(contains("ok"));
    schemagen()
        .args(["validate", dtypes.to_str().unwrap(), "-d"])
        .assert()
        .success();

    schemagen()
        .args(["validate", dtypes.to_str().unwrap(), "-p"])
        .assert()
        .failure()
        .stderr(contains("missing 'schema'"));

    let broken = workspace.write(
        "broken.json",
        r#"{"schema": {"A": {"dtype": "uint8", "kind": "categorical", "values": [1], "codes": [2]}}}"#,
    );
    schemagen()
        .args(["validate", broken.to_str().unwrap(), "-p"])
        .assert()
        .failure()
        .stderr(contains("schema.A.codes"));
}

#[test]
fn validate_requires_a_document_kind() {
    schemagen()
        .args(["validate", "parameters.json"])
        .assert()
        .failure();
}
