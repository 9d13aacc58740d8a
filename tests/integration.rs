use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn fstore_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fstore"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/fstore.sqlite"

[embedding]
dims = 8

[retrieval]
default_limit = 5
max_limit = 50

[[shredding.rules]]
list_key = "findings"
item_type = "finding"
content_field = "summary"
id_field = "finding_id"
domain = "audit"
"#,
        root.display()
    );

    let config_path = config_dir.join("fstore.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn write_envelopes(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).unwrap();
    path
}

fn policy_envelope(content: &str, requirements: &str) -> String {
    format!(
        r#"{{
            "id": "policy-1",
            "source_type": "policy",
            "source_url": "https://example.com/policies/security",
            "content": "{}",
            "record": {{
                "policy_title": "Security Policy",
                "policy_type": "IT",
                "requirements": {}
            }}
        }}"#,
        content, requirements
    )
}

const TWO_REQUIREMENTS: &str = r#"[
    {"statement": "A", "requirement_type": "mandatory", "source_section": "1"},
    {"statement": "B", "requirement_type": "recommended"}
]"#;

const ONE_REQUIREMENT: &str = r#"[{"statement": "C", "requirement_type": "mandatory"}]"#;

fn run_fstore(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = fstore_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run fstore binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ingest(config_path: &Path, file: &Path) -> String {
    let (stdout, stderr, success) = run_fstore(config_path, &["ingest", file.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_fstore(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/fstore.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_fstore(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_fstore(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_create_unchanged_update() {
    let (tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);

    let v1 = write_envelopes(tmp.path(), "v1.json", &policy_envelope("v1", TWO_REQUIREMENTS));
    let stdout = ingest(&config_path, &v1);
    assert!(stdout.contains("created: 1"));
    assert!(stdout.contains("facts written: 2"));
    assert!(stdout.contains("ok"));

    let stdout = ingest(&config_path, &v1);
    assert!(stdout.contains("unchanged: 1"));
    assert!(stdout.contains("facts written: 0"));

    let v2 = write_envelopes(tmp.path(), "v2.json", &policy_envelope("v2", ONE_REQUIREMENT));
    let stdout = ingest(&config_path, &v2);
    assert!(stdout.contains("updated: 1"));
    assert!(stdout.contains("facts written: 1"));

    let (stdout, _, success) = run_fstore(&config_path, &["get", "policy-1"]);
    assert!(success);
    assert!(stdout.contains("version:           2"));
    assert!(stdout.contains("--- Facts (1) ---"));
    assert!(stdout.contains("Security Policy"));
}

#[test]
fn test_ingest_array_and_dry_run() {
    let (tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);

    let batch = format!(
        r#"[
            {},
            {{
                "source_type": "audit_report",
                "source_url": "https://example.com/audit/2024",
                "domain": "audit",
                "content": "audit body",
                "record": {{
                    "title": "Annual Audit",
                    "findings": [
                        {{"finding_id": "F-1", "summary": "Missing backups"}},
                        {{"finding_id": "F-2", "summary": "Stale accounts"}},
                        7
                    ]
                }}
            }}
        ]"#,
        policy_envelope("v1", TWO_REQUIREMENTS)
    );
    let file = write_envelopes(tmp.path(), "batch.json", &batch);

    let (stdout, _, success) =
        run_fstore(&config_path, &["ingest", file.to_str().unwrap(), "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("facts: 4"));
    assert!(stdout.contains("schema mismatches: 1"));

    let (stdout, _, _) = run_fstore(&config_path, &["stats"]);
    assert!(stdout.contains("Documents:   0"));

    let stdout = ingest(&config_path, &file);
    assert!(stdout.contains("envelopes: 2"));
    assert!(stdout.contains("created: 2"));
    assert!(stdout.contains("facts written: 4"));
    assert!(stdout.contains("schema mismatches: 1"));

    let (stdout, _, success) = run_fstore(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Documents:   2"));
    assert!(stdout.contains("Facts:       4"));
    assert!(stdout.contains("audit_report"));
}

#[test]
fn test_query_filters_as_json() {
    let (tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);
    let v1 = write_envelopes(tmp.path(), "v1.json", &policy_envelope("v1", TWO_REQUIREMENTS));
    ingest(&config_path, &v1);

    let (stdout, stderr, success) = run_fstore(
        &config_path,
        &[
            "query",
            "--filter",
            "requirement_type=mandatory",
            "--domain",
            "IT",
        ],
    );
    assert!(success, "query failed: {}", stderr);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["content_text"], "A");
    assert_eq!(items[0]["item_type"], "requirement");
    assert_eq!(items[0]["location_pointer"], "1");
    assert_eq!(items[0]["document_title"], "Security Policy");
    assert_eq!(
        items[0]["document_url"],
        "https://example.com/policies/security"
    );

    let (stdout, _, _) = run_fstore(&config_path, &["query", "--domain", "Financial"]);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(items.as_array().unwrap().is_empty());

    let (stdout, _, _) = run_fstore(&config_path, &["query", "--limit", "1"]);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(items.as_array().unwrap().len(), 1);
}

#[test]
fn test_query_filter_needs_quotes_for_numeric_strings() {
    let (tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);
    let v1 = write_envelopes(tmp.path(), "v1.json", &policy_envelope("v1", TWO_REQUIREMENTS));
    ingest(&config_path, &v1);

    let (stdout, _, success) =
        run_fstore(&config_path, &["query", "--filter", "source_section=1"]);
    assert!(success);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(items.as_array().unwrap().is_empty());

    let (stdout, _, success) =
        run_fstore(&config_path, &["query", "--filter", "source_section=\"1\""]);
    assert!(success);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(items.as_array().unwrap().len(), 1);

    let (stdout, _, success) = run_fstore(&config_path, &["query", "--help"]);
    assert!(success);
    assert!(stdout.contains("'\"3\"'"));
}

#[test]
fn test_query_rejects_malformed_filter() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_fstore(&config_path, &["query", "--filter", "no-equals"]);
    assert!(!success);
    assert!(stderr.contains("KEY=VALUE"));
}

#[test]
fn test_audit_trail() {
    let (tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);
    let v1 = write_envelopes(tmp.path(), "v1.json", &policy_envelope("v1", TWO_REQUIREMENTS));
    let v2 = write_envelopes(tmp.path(), "v2.json", &policy_envelope("v2", ONE_REQUIREMENT));
    ingest(&config_path, &v1);
    ingest(&config_path, &v1);
    ingest(&config_path, &v2);

    let (stdout, _, success) = run_fstore(&config_path, &["audit", "policy-1"]);
    assert!(success);
    assert!(stdout.contains("Initial extraction"));
    assert!(stdout.contains("Updated to version 2"));
    assert_eq!(stdout.matches("create").count(), 1);
    assert_eq!(stdout.matches("update").count(), 1);
}

#[test]
fn test_get_missing_document() {
    let (_tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);

    let (_, stderr, success) = run_fstore(&config_path, &["get", "does-not-exist"]);
    assert!(!success, "get on missing document should fail");
    assert!(stderr.contains("not found"));
}

#[test]
fn test_list_and_delete() {
    let (tmp, config_path) = setup_test_env();
    run_fstore(&config_path, &["init"]);
    let v1 = write_envelopes(tmp.path(), "v1.json", &policy_envelope("v1", TWO_REQUIREMENTS));
    ingest(&config_path, &v1);

    let (stdout, _, success) = run_fstore(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("policy-1"));
    assert!(stdout.contains("showing 1 of 1"));

    let (stdout, _, _) = run_fstore(&config_path, &["list", "--source-type", "article"]);
    assert!(stdout.contains("No documents."));

    let (stdout, _, success) = run_fstore(&config_path, &["delete", "policy-1"]);
    assert!(success);
    assert!(stdout.contains("deleted policy-1"));

    let (_, _, success) = run_fstore(&config_path, &["get", "policy-1"]);
    assert!(!success);

    let (stdout, _, _) = run_fstore(&config_path, &["query"]);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(items.as_array().unwrap().is_empty());

    let (stdout, _, success) = run_fstore(&config_path, &["delete", "policy-1"]);
    assert!(success);
    assert!(stdout.contains("no document"));

    let (stdout, _, _) = run_fstore(&config_path, &["audit", "policy-1"]);
    assert!(stdout.contains("Initial extraction"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"x.sqlite\"\n\n[embedding]\nprovider = \"openai\"\n",
    )
    .unwrap();

    let (_, stderr, success) = run_fstore(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Unknown embedding provider"));
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_fstore(&tmp.path().join("absent.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
