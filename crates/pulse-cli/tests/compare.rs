use assert_cmd::cargo::cargo_bin_cmd;
use pulse_lib::report::{Document, Value};
use std::{error::Error, path::Path};

fn document(sdnn: f64) -> Document {
    let mut doc = Document::default();
    doc.measures.insert("bpm".into(), Value::Number(71.4));
    doc.measures.insert("sdnn".into(), Value::Number(sdnn));
    doc.working_data
        .insert("peaklist".into(), Value::Indices(vec![60, 140, 221]));
    doc
}

fn write(doc: &Document, path: &Path) -> Result<(), Box<dyn Error>> {
    doc.write_atomic(path)?;
    Ok(())
}

#[test]
fn matching_documents_pass() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let left = dir.path().join("left.json");
    let right = dir.path().join("right.json");
    write(&document(25.0), &left)?;
    write(&document(25.0 + 1e-9), &right)?;

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.arg("compare").arg(&left).arg(&right);
    let output = cmd.assert().success().get_output().stdout.clone();
    let cmp: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(cmp["identical"], serde_json::json!(["bpm", "sdnn"]));
    Ok(())
}

#[test]
fn differing_measure_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let left = dir.path().join("left.json");
    let right = dir.path().join("right.json");
    write(&document(25.0), &left)?;
    write(&document(31.5), &right)?;

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.arg("compare").arg(&left).arg(&right);
    let assert = cmd.assert().failure();
    let output = assert.get_output();
    let cmp: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(cmp["different"][0]["key"], "sdnn");
    assert_eq!(cmp["different"][0]["diff"], serde_json::json!([6.5]));
    assert!(String::from_utf8_lossy(&output.stderr).contains("documents differ"));
    Ok(())
}

#[test]
fn loose_tolerance_accepts_difference() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let left = dir.path().join("left.json");
    let right = dir.path().join("right.json");
    write(&document(25.0), &left)?;
    write(&document(25.5), &right)?;

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.arg("compare")
        .arg(&left)
        .arg(&right)
        .args(["--tolerance", "1"]);
    cmd.assert().success();
    Ok(())
}

#[test]
fn malformed_document_is_reported() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let left = dir.path().join("left.json");
    let right = dir.path().join("right.json");
    write(&document(25.0), &left)?;
    std::fs::write(&right, "{\"measures\": ")?;

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.arg("compare").arg(&left).arg(&right);
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&stderr).contains("invalid JSON"));
    Ok(())
}
