//! Integration tests for the tribunal CLI.
//!
//! Every test runs against its own temporary data directory and without an API
//! key, so analysis always goes through the heuristic scorer.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a tribunal Command bound to `data_dir`
fn tribunal(data_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tribunal");
    cmd.arg("--data-dir")
        .arg(data_dir.path())
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn analyze_json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = tribunal(dir)
        .arg("analyze")
        .args(args)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "analyze failed: {:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_tribunal_help() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("analyze"))
            .stdout(predicate::str::contains("play"));
    }

    #[test]
    fn test_tribunal_version() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_cases_lists_builtin_catalog() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .arg("cases")
            .assert()
            .success()
            .stdout(predicate::str::contains("bread-thief"))
            .stdout(predicate::str::contains("장발장"));
    }

    #[test]
    fn test_cases_file_override() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tribunal.toml"),
            "[storage]\ncases_file = \"my-cases.json\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("my-cases.json"),
            r#"[{"id":"custom","title":"사용자 사건","scenario":"s","law":"l",
                "realCase":{"verdict":"v","reason":"r"},
                "aiCase":{"verdict":"v","reason":"r"}}]"#,
        )
        .unwrap();

        tribunal(&dir)
            .arg("cases")
            .assert()
            .success()
            .stdout(predicate::str::contains("custom"))
            .stdout(predicate::str::contains("bread-thief").not());
    }
}

// =============================================================================
// Analysis Tests
// =============================================================================

mod analysis {
    use super::*;

    #[test]
    fn test_analyze_without_key_uses_heuristic() {
        let dir = TempDir::new().unwrap();
        let json = analyze_json(
            &dir,
            &[
                "--case",
                "bread-thief",
                "--verdict",
                "유죄",
                "--sentence",
                "사형",
                "--reason",
                "그냥 사형에 처해야 합니다",
            ],
        );
        assert_eq!(json["emotionScore"], 90);
        assert_eq!(json["legalScore"], 5);
        assert_eq!(json["biases"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_analyze_legal_reasoning() {
        let dir = TempDir::new().unwrap();
        let json = analyze_json(
            &dir,
            &[
                "--case",
                "bread-thief",
                "--verdict",
                "guilty",
                "--sentence",
                "집행유예",
                "--reason",
                "형법 규정과 판례에 따른 판단입니다",
            ],
        );
        assert_eq!(json["legalScore"], 95);
        assert_eq!(json["emotionScore"], 15);
    }

    #[test]
    fn test_guilty_without_sentence_is_rejected() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .args(["analyze", "--case", "bread-thief", "--verdict", "유죄", "--reason", "이유"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("형량을 지정해주세요"));
    }

    #[test]
    fn test_unknown_case_is_rejected() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .args(["analyze", "--case", "nope", "--verdict", "무죄", "--reason", "이유"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown case"));
    }

    #[test]
    fn test_unknown_verdict_is_rejected() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .args(["analyze", "--case", "bread-thief", "--verdict", "maybe", "--reason", "이유"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown verdict"));
    }

    #[test]
    fn test_analysis_is_stored_and_summarized() {
        let dir = TempDir::new().unwrap();
        analyze_json(
            &dir,
            &["--case", "bread-thief", "--verdict", "무죄", "--reason", "생계형 범죄라 안타깝습니다"],
        );
        analyze_json(
            &dir,
            &[
                "--case",
                "bread-thief",
                "--verdict",
                "유죄",
                "--sentence",
                "벌금형",
                "--reason",
                "전과가 있어 처벌이 합당합니다",
            ],
        );

        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("verdicts.json")).unwrap())
                .unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 2);
        assert_eq!(stored[0]["caseId"], "bread-thief");
        assert!(stored[1]["survey"]["q5"].is_null());

        tribunal(&dir)
            .args(["stats", "--case", "bread-thief"])
            .assert()
            .success()
            .stdout(predicate::str::contains("유죄 비율: 50%, 무죄 비율: 50%"))
            .stdout(predicate::str::contains("벌금형: 1"));
    }

    #[test]
    fn test_stats_without_verdicts() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .args(["stats", "--case", "bread-thief"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No verdicts recorded"));
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_init_then_show() {
        let dir = TempDir::new().unwrap();
        tribunal(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created tribunal.toml"));
        assert!(dir.path().join("tribunal.toml").exists());

        tribunal(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        tribunal(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cooldown_ms = 1000"))
            .stdout(predicate::str::contains("api key = missing"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tribunal.toml"),
            "[retry]\nbackoff_ms = []\n[inference]\ntemperature = 3.5\n",
        )
        .unwrap();

        tribunal(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("backoff_ms is empty"))
            .stdout(predicate::str::contains("temperature"));
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tribunal.toml"), "[queue\n").unwrap();
        tribunal(&dir).arg("cases").assert().failure();
    }

    #[test]
    fn test_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[queue]\ncooldown_ms = 250\n").unwrap();
        tribunal(&dir)
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cooldown_ms = 250"));
    }
}
