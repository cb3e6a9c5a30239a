use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BILL: &str = "\
BỆNH VIỆN ĐA KHOA TÂM ANH
PHIẾU THANH TOÁN
Số hóa đơn: HD2024-00123
Ngày lập: 15/03/2024
Họ và tên: Nguyễn Văn An
Dịch vụ | SL | Đơn giá | Thành tiền
Khám bệnh | 1 | 150.000 | 150.000
Xét nghiệm máu | 2 | 200.000 | 400.000
Tổng cộng: 550.000 vnđ";

const INCOMPLETE_BILL: &str = "\
Họ và tên: Nguyễn Văn An
Khám bệnh | 1 | 150.000 | 150.000";

const CUSTOM_TEMPLATE: &str = r#"{
  "document_type": "referral",
  "fields": [
    {
      "name": "referralCode",
      "type": "text",
      "required": true,
      "patterns": [
        { "strategy": "regex", "pattern": "Mã chuyển viện:\\s*([A-Z0-9-]+)", "priority": 1 }
      ]
    }
  ]
}"#;

/// Command isolated from the user's configuration directory.
fn claimex(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("claimex").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_extract_bill_json() {
    let home = TempDir::new().unwrap();
    let input = write(home.path(), "bill.txt", BILL);

    claimex(&home)
        .args(["extract", "-t", "medical_bill"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("HD2024-00123"))
        .stdout(predicate::str::contains("\"documentType\": \"medical_bill\""));
}

#[test]
fn test_extract_csv_output_file() {
    let home = TempDir::new().unwrap();
    let input = write(home.path(), "bill.txt", BILL);
    let output = home.path().join("bill.csv");

    claimex(&home)
        .args(["extract", "-t", "medical_bill", "-f", "csv", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("field,value,confidence"));
    assert!(csv.contains("billNumber,HD2024-00123,"));
}

#[test]
fn test_extract_reports_missing_required_fields() {
    let home = TempDir::new().unwrap();
    let input = write(home.path(), "bill.txt", INCOMPLETE_BILL);

    claimex(&home)
        .args(["extract", "-t", "medical_bill"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("billNumber"));
}

#[test]
fn test_extract_unknown_type_fails() {
    let home = TempDir::new().unwrap();
    let input = write(home.path(), "bill.txt", BILL);

    claimex(&home)
        .args(["extract", "-t", "discharge_summary"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no extraction template"));
}

#[test]
fn test_extract_missing_input_fails() {
    let home = TempDir::new().unwrap();

    claimex(&home)
        .args(["extract", "-t", "medical_bill", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_extract_with_custom_template() {
    let home = TempDir::new().unwrap();
    let template = write(home.path(), "referral.json", CUSTOM_TEMPLATE);
    let input = write(
        home.path(),
        "referral.txt",
        "GIẤY CHUYỂN VIỆN\nMã chuyển viện: CV-2024-77\n",
    );

    claimex(&home)
        .args(["extract", "-t", "referral", "--template"])
        .arg(&template)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("CV-2024-77"));
}

#[test]
fn test_batch_with_summary() {
    let home = TempDir::new().unwrap();
    let inputs = home.path().join("inputs");
    let out = home.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    write(&inputs, "a.txt", BILL);
    write(&inputs, "b.txt", INCOMPLETE_BILL);

    let pattern = inputs.join("*.txt");
    claimex(&home)
        .args(["batch", "-t", "medical_bill", "--summary", "-j", "2", "-o"])
        .arg(&out)
        .arg(pattern.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    assert!(out.join("a.json").exists());
    assert!(out.join("b.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let mut lines = summary.lines();
    assert!(lines.next().unwrap().starts_with("filename,status,document_type"));
    assert!(lines.next().unwrap().starts_with("a.txt,success,medical_bill"));
    assert!(lines.next().unwrap().starts_with("b.txt,success,medical_bill"));
}

#[test]
fn test_batch_same_stem_in_different_directories() {
    let home = TempDir::new().unwrap();
    let inputs = home.path().join("inputs");
    let out = home.path().join("out");
    for dir in ["a", "b"] {
        fs::create_dir_all(inputs.join(dir)).unwrap();
    }
    write(&inputs.join("a"), "bill.txt", BILL);
    write(&inputs.join("b"), "bill.txt", &BILL.replace("HD2024-00123", "HD2024-00456"));

    let pattern = inputs.join("*").join("bill.txt");
    claimex(&home)
        .args(["batch", "-t", "medical_bill", "-o"])
        .arg(&out)
        .arg(pattern.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    let first = fs::read_to_string(out.join("bill.json")).unwrap();
    let second = fs::read_to_string(out.join("bill_2.json")).unwrap();
    assert!(first.contains("HD2024-00123"));
    assert!(second.contains("HD2024-00456"));
}

#[test]
fn test_batch_no_matches_fails() {
    let home = TempDir::new().unwrap();
    let pattern = home.path().join("*.txt");

    claimex(&home)
        .args(["batch", "-t", "medical_bill"])
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_templates_list() {
    let home = TempDir::new().unwrap();

    claimex(&home)
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lab_result"))
        .stdout(predicate::str::contains("medical_bill"))
        .stdout(predicate::str::contains("prescription"));
}

#[test]
fn test_templates_export_and_reuse() {
    let home = TempDir::new().unwrap();
    let exported = home.path().join("bill_template.json");

    claimex(&home)
        .args(["templates", "export", "medical_bill", "-o"])
        .arg(&exported)
        .assert()
        .success();

    let json = fs::read_to_string(&exported).unwrap();
    assert!(json.contains("\"document_type\": \"medical_bill\""));

    // The exported template drives extraction on its own
    let input = write(home.path(), "bill.txt", BILL);
    claimex(&home)
        .args(["extract", "-t", "medical_bill", "--template"])
        .arg(&exported)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("HD2024-00123"));
}

#[test]
fn test_templates_show_unknown_fails() {
    let home = TempDir::new().unwrap();

    claimex(&home)
        .args(["templates", "show", "discharge_summary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown document type"));
}

#[test]
fn test_config_init_set_get() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("claimex.json");
    let config = config.to_str().unwrap();

    claimex(&home)
        .args(["-c", config, "config", "init"])
        .assert()
        .success();

    claimex(&home)
        .args(["-c", config, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    claimex(&home)
        .args(["-c", config, "config", "set", "extraction.review_threshold", "0.5"])
        .assert()
        .success();

    claimex(&home)
        .args(["-c", config, "config", "get", "extraction.review_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.5"));

    claimex(&home)
        .args(["-c", config, "config", "get", "extraction.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    let input = write(home.path(), "bill.txt", BILL);

    claimex(&home)
        .args(["-c", "missing.json", "extract", "-t", "medical_bill"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
