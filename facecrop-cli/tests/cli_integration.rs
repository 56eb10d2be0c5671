mod common;

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use facecrop_utils::DetectorKind;
use serde_json::Value;
use tempfile::tempdir;

use common::{find_model_path, stderr_of, write_blank_image};

#[test]
fn missing_model_fails_before_processing() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("face.png");
    write_blank_image(&input);
    let output_dir = dir.path().join("out");

    let mut cmd = cargo_bin_cmd!("facecrop");
    cmd.arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--model")
        .arg(dir.path().join("missing.onnx"));
    let output = cmd.assert().failure().get_output().clone();

    assert!(stderr_of(&output).contains("failed to load model"));
    assert!(!output_dir.exists(), "nothing should be written");
}

#[test]
fn empty_directory_fails() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("readme.txt"), "no images here").expect("write");

    let mut cmd = cargo_bin_cmd!("facecrop");
    cmd.arg("--input").arg(dir.path());
    let output = cmd.assert().failure().get_output().clone();
    assert!(stderr_of(&output).contains("no images found"));
}

#[test]
fn missing_input_fails() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("facecrop");
    cmd.arg("--input").arg(dir.path().join("nope.jpg"));
    let output = cmd.assert().failure().get_output().clone();
    assert!(stderr_of(&output).contains("path does not exist"));
}

#[test]
fn unknown_preset_fails() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("face.png");
    write_blank_image(&input);

    let mut cmd = cargo_bin_cmd!("facecrop");
    cmd.arg("--input")
        .arg(&input)
        .arg("--preset")
        .arg("billboard");
    let output = cmd.assert().failure().get_output().clone();
    assert!(stderr_of(&output).contains("unknown preset 'billboard'"));
}

#[test]
fn explicit_output_rejects_directory_input() {
    let dir = tempdir().expect("tempdir");
    write_blank_image(&dir.path().join("a.png"));

    let mut cmd = cargo_bin_cmd!("facecrop");
    cmd.arg("--input")
        .arg(dir.path())
        .arg("--output")
        .arg(dir.path().join("crop.jpg"));
    let output = cmd.assert().failure().get_output().clone();
    assert!(stderr_of(&output).contains("single file"));
}

#[test]
fn faceless_batch_fails_and_reports_each_input() {
    for kind in [DetectorKind::Yunet, DetectorKind::Cascade] {
        let Some(model) = find_model_path(kind) else {
            continue;
        };
        let dir = tempdir().expect("tempdir");
        let input_dir = dir.path().join("in");
        fs::create_dir_all(input_dir.join("nested")).expect("mkdir");
        write_blank_image(&input_dir.join("one.png"));
        write_blank_image(&input_dir.join("nested/two.png"));
        let summary = dir.path().join("summary.json");

        let mut cmd = cargo_bin_cmd!("facecrop");
        cmd.arg("--input")
            .arg(&input_dir)
            .arg("--output-dir")
            .arg(dir.path().join("out"))
            .arg("--detector")
            .arg(kind.to_string())
            .arg("--model")
            .arg(&model)
            .arg("--summary")
            .arg(&summary);
        cmd.assert().failure();

        let report: Value =
            serde_json::from_str(&fs::read_to_string(&summary).expect("summary")).expect("json");
        assert_eq!(report["failed"], 2);
        assert_eq!(report["processed"], 0);
        let results = report["results"].as_array().expect("results");
        assert_eq!(results.len(), 2);
        for entry in results {
            assert_eq!(entry["error"], "no face found");
            assert!(entry.get("output").is_none());
        }
    }
}
