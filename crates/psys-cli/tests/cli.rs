// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenarios against the built `psys` binary: happy path, obligation miss, waiver
//! suppression, expired waiver, immiscible domains, and DSSE sign + self-verify.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use ed25519_dalek::pkcs8::{EncodePrivateKey, LineEnding};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Writes every document a minimal corpus needs other than `compounds/comp.x.json`: one rule,
/// `r.require_b`, that fires on `exp.a` and requires `evi.b`; one pack, `internet_app`, default
/// enabled so the domain both elements declare clears domain→pack enforcement; profile `ship`.
fn write_shared_docs(dir: &Path) {
    write(
        dir,
        "index.json",
        r#"{
          "schema": "periodic.index.v1",
          "tables": {"experience": "tables/experience.json", "evidence": "tables/evidence.json"},
          "bond_rules": "rules/base.json",
          "bond_packs": "packs/packs.json",
          "profiles": "profiles.json",
          "domains": "domains.json",
          "core_tags": "core_tags.json",
          "table_metadata": "table_metadata.json",
          "atomic_properties": "atomic_properties.json",
          "spel_semantics": "spel_semantics.json",
          "domain_completion": "domain_completion.json",
          "flow_workshop_pairs": "flow_workshop_pairs.json",
          "examples": "golden_corpus.json",
          "negative_examples": "negative_examples.json",
          "system_negative_examples": "system_negative_examples.json",
          "systems": "systems",
          "strategies": "strategy_registry.json"
        }"#,
    );
    write(
        dir,
        "tables/experience.json",
        r#"{"schema":"periodic.element.v1","table":"experience","elements":[
          {"id":"exp.a","table":"experience","group":"g","name":"a","summary":"s","domain":"internet_app"}
        ]}"#,
    );
    write(
        dir,
        "tables/evidence.json",
        r#"{"schema":"periodic.element.v1","table":"evidence","elements":[
          {"id":"evi.b","table":"evidence","group":"g","name":"b","summary":"s","domain":"internet_app"}
        ]}"#,
    );
    write(
        dir,
        "rules/base.json",
        r#"{"schema":"periodic.bond_rules.v1","rules":[
          {"id":"r.require_b","when":{"any_of":["exp.a"]},"require":{"all_of":["evi.b"]},
           "message":"exp.a needs evi.b","severity":"error"}
        ]}"#,
    );
    write(
        dir,
        "packs/packs.json",
        r#"{"schema":"periodic.bond_packs.v1","packs":[
          {"id":"internet_app","path":"packs/internet_app.rules.json","domains":["internet_app"],
           "default_enabled":true,"description":"internet-facing compounds"}
        ]}"#,
    );
    write(dir, "packs/internet_app.rules.json", r#"{"schema":"periodic.bond_rules.v1","rules":[]}"#);
    write(
        dir,
        "domains.json",
        r#"{"schema":"periodic.domains.v1","domains":[
          {"id":"internet_app","name":"Internet App","summary":"s","reason_for_existence":"r","collapse_risk":"c"},
          {"id":"membrane","name":"Membrane","summary":"s","reason_for_existence":"r","collapse_risk":"c"}
        ],"neutral_domain":"membrane","immiscible":[]}"#,
    );
    write(
        dir,
        "profiles.json",
        r#"{"schema":"periodic.profiles.v1","profiles":[{"name":"ship","severity_overrides":{},"enabled_packs":[]}]}"#,
    );
    write(dir, "core_tags.json", r#"{"schema":"periodic.core_tags.v1","tags":[]}"#);
    write(dir, "table_metadata.json", r#"{"schema":"periodic.table_metadata.v1","tables":{}}"#);
    write(dir, "atomic_properties.json", r#"{"schema":"periodic.atomic_properties.v1"}"#);
    write(
        dir,
        "spel_semantics.json",
        r#"{"schema":"periodic.spel_semantics.v1","endorsement":"meaning_preserving",
          "declassification":"meaning_preserving","control_flow":"meaning_preserving",
          "termination":"meaning_preserving","timing":"meaning_preserving"}"#,
    );
    write(
        dir,
        "domain_completion.json",
        r#"{"schema":"periodic.domain_completion.v1","packs":{
          "internet_app":{"status":"draft","rules":[],"min_positive_examples":0,"min_negative_examples":0}
        }}"#,
    );
    write(dir, "flow_workshop_pairs.json", r#"{"schema":"periodic.flow_workshop_pairs.v1","pairs":[]}"#);
    write(dir, "golden_corpus.json", r#"{"schema":"periodic.golden_corpus.v1","examples":[]}"#);
    write(dir, "negative_examples.json", r#"{"schema":"periodic.negative_examples.v1","cases":[]}"#);
    write(
        dir,
        "system_negative_examples.json",
        r#"{"schema":"periodic.system_negative_examples.v1","cases":[]}"#,
    );
    write(dir, "strategy_registry.json", r#"{"schema":"periodic.strategy_registry.v1","strategies":[]}"#);
    write(
        dir,
        "systems/system.main.json",
        r#"{"schema":"periodic.system.v1","id":"system.main",
          "compounds":[{"as":"x","path":"compounds/comp.x.json"}],"links":[],"waivers":[]}"#,
    );
}

fn write_compound(dir: &Path, elements: &[&str], waivers_json: &str) {
    let elements_json = elements.iter().map(|e| format!("{e:?}")).collect::<Vec<_>>().join(",");
    write(
        dir,
        "compounds/comp.x.json",
        &format!(
            r#"{{"schema":"periodic.compound.v1","id":"comp.x","name":"x","tables_version":"v1",
              "elements":[{elements_json}],"waivers":[{waivers_json}]}}"#
        ),
    );
}

fn bin() -> Command {
    Command::cargo_bin("psys").unwrap()
}

#[test]
fn happy_path_strict_passes_with_no_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_shared_docs(dir.path());
    write_compound(dir.path(), &["exp.a", "evi.b"], "");

    let first = bin()
        .arg(dir.path().join("index.json"))
        .args(["--strict", "--stdout-json"])
        .assert()
        .success();
    let first_stdout = String::from_utf8(first.get_output().stdout.clone()).unwrap();
    let first_report: serde_json::Value = serde_json::from_str(&first_stdout).unwrap();
    assert_eq!(first_report["ok"], serde_json::json!(true));
    assert_eq!(first_report["errors"], serde_json::json!([]));
    assert_eq!(first_report["warnings"], serde_json::json!([]));

    let second = bin()
        .arg(dir.path().join("index.json"))
        .args(["--strict", "--stdout-json"])
        .assert()
        .success();
    let second_stdout = String::from_utf8(second.get_output().stdout.clone()).unwrap();
    let second_report: serde_json::Value = serde_json::from_str(&second_stdout).unwrap();
    assert_eq!(
        first_report["receipt"]["receipt_hash_sha256"],
        second_report["receipt"]["receipt_hash_sha256"],
    );
}

#[test]
fn obligation_miss_reports_remediation_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_shared_docs(dir.path());
    write_compound(dir.path(), &["exp.a"], "");

    let assert = bin().arg(dir.path().join("index.json")).args(["--strict", "--stdout-json"]).assert();
    assert.code(2);
    let output = bin().arg(dir.path().join("index.json")).args(["--strict", "--stdout-json"]).output().unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ok"], serde_json::json!(false));
    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["rule_id"], serde_json::json!("r.require_b"));
    assert_eq!(errors[0]["atom"]["missing_all_of"], serde_json::json!(["evi.b"]));
    assert_eq!(errors[0]["remediation"]["add_elements"], serde_json::json!(["evi.b"]));
    assert_eq!(errors[0]["remediation"]["add_evidence_ids"], serde_json::json!(["evi.b"]));
    assert_eq!(errors[0]["remediation"]["tie_break"], serde_json::Value::Null);
}

#[test]
fn live_waiver_suppresses_the_violation() {
    let dir = tempfile::tempdir().unwrap();
    write_shared_docs(dir.path());
    write_compound(
        dir.path(),
        &["exp.a"],
        r#"{"rule_id":"r.require_b","target":"compound","rationale":"beta",
           "mitigations":["element:exp.a"],"expires_on":"2999-12-31"}"#,
    );

    let output = bin()
        .arg(dir.path().join("index.json"))
        .args(["--strict", "--stdout-json", "--as_of", "2024-05-01"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ok"], serde_json::json!(true));
    assert!(report["errors"].as_array().unwrap().is_empty());
    assert!(report["warnings"].as_array().unwrap().is_empty());

    let traced = bin()
        .arg(dir.path().join("index.json"))
        .args(["--strict", "--stdout-json", "--trace", "--as_of", "2024-05-01"])
        .output()
        .unwrap();
    let traced_report: serde_json::Value = serde_json::from_slice(&traced.stdout).unwrap();
    let entries = traced_report["trace"]["entries"].as_array().unwrap();
    let suppressed = entries.iter().find(|e| e["rule_id"] == "r.require_b").unwrap();
    assert!(suppressed["waiver_scars"].is_object());
}

#[test]
fn expired_waiver_fails_with_both_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_shared_docs(dir.path());
    write_compound(
        dir.path(),
        &["exp.a"],
        r#"{"rule_id":"r.require_b","target":"compound","rationale":"beta",
           "mitigations":["element:exp.a"],"expires_on":"2000-01-01"}"#,
    );

    let output = bin()
        .arg(dir.path().join("index.json"))
        .args(["--strict", "--stdout-json", "--as_of", "2024-05-01"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ok"], serde_json::json!(false));
    let errors = report["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["code"] == "WAIVER_EXPIRED"));
    assert!(errors.iter().any(|e| e["rule_id"] == "r.require_b"));
}

#[test]
fn immiscible_domains_produce_a_single_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "index.json",
        r#"{
          "schema": "periodic.index.v1",
          "tables": {"experience": "tables/experience.json"},
          "bond_rules": "rules/base.json",
          "bond_packs": "packs/packs.json",
          "profiles": "profiles.json",
          "domains": "domains.json",
          "core_tags": "core_tags.json",
          "table_metadata": "table_metadata.json",
          "atomic_properties": "atomic_properties.json",
          "spel_semantics": "spel_semantics.json",
          "domain_completion": "domain_completion.json",
          "flow_workshop_pairs": "flow_workshop_pairs.json",
          "examples": "golden_corpus.json",
          "negative_examples": "negative_examples.json",
          "system_negative_examples": "system_negative_examples.json",
          "systems": "systems",
          "strategies": "strategy_registry.json"
        }"#,
    );
    write(
        dir.path(),
        "tables/experience.json",
        r#"{"schema":"periodic.element.v1","table":"experience","elements":[
          {"id":"exp.a","table":"experience","group":"g","name":"a","summary":"s","domain":"internet_app"},
          {"id":"exp.c","table":"experience","group":"g","name":"c","summary":"s","domain":"embedded_realtime"}
        ]}"#,
    );
    write(dir.path(), "rules/base.json", r#"{"schema":"periodic.bond_rules.v1","rules":[]}"#);
    write(
        dir.path(),
        "packs/packs.json",
        r#"{"schema":"periodic.bond_packs.v1","packs":[
          {"id":"embedded_realtime","path":"packs/embedded_realtime.rules.json","domains":["embedded_realtime"],
           "default_enabled":true,"description":""},
          {"id":"internet_app","path":"packs/internet_app.rules.json","domains":["internet_app"],
           "default_enabled":true,"description":""}
        ]}"#,
    );
    write(dir.path(), "packs/internet_app.rules.json", r#"{"schema":"periodic.bond_rules.v1","rules":[]}"#);
    write(dir.path(), "packs/embedded_realtime.rules.json", r#"{"schema":"periodic.bond_rules.v1","rules":[]}"#);
    write(
        dir.path(),
        "domains.json",
        r#"{"schema":"periodic.domains.v1","domains":[
          {"id":"embedded_realtime","name":"Embedded Realtime","summary":"s","reason_for_existence":"r","collapse_risk":"c"},
          {"id":"internet_app","name":"Internet App","summary":"s","reason_for_existence":"r","collapse_risk":"c"}
        ],"immiscible":[["internet_app","embedded_realtime"]]}"#,
    );
    write(
        dir.path(),
        "profiles.json",
        r#"{"schema":"periodic.profiles.v1","profiles":[{"name":"ship","severity_overrides":{},"enabled_packs":[]}]}"#,
    );
    write(dir.path(), "core_tags.json", r#"{"schema":"periodic.core_tags.v1","tags":[]}"#);
    write(dir.path(), "table_metadata.json", r#"{"schema":"periodic.table_metadata.v1","tables":{}}"#);
    write(dir.path(), "atomic_properties.json", r#"{"schema":"periodic.atomic_properties.v1"}"#);
    write(
        dir.path(),
        "spel_semantics.json",
        r#"{"schema":"periodic.spel_semantics.v1","endorsement":"meaning_preserving",
          "declassification":"meaning_preserving","control_flow":"meaning_preserving",
          "termination":"meaning_preserving","timing":"meaning_preserving"}"#,
    );
    write(dir.path(), "domain_completion.json", r#"{"schema":"periodic.domain_completion.v1","packs":{}}"#);
    write(dir.path(), "flow_workshop_pairs.json", r#"{"schema":"periodic.flow_workshop_pairs.v1","pairs":[]}"#);
    write(dir.path(), "golden_corpus.json", r#"{"schema":"periodic.golden_corpus.v1","examples":[]}"#);
    write(dir.path(), "negative_examples.json", r#"{"schema":"periodic.negative_examples.v1","cases":[]}"#);
    write(
        dir.path(),
        "system_negative_examples.json",
        r#"{"schema":"periodic.system_negative_examples.v1","cases":[]}"#,
    );
    write(dir.path(), "strategy_registry.json", r#"{"schema":"periodic.strategy_registry.v1","strategies":[]}"#);
    write(
        dir.path(),
        "systems/system.main.json",
        r#"{"schema":"periodic.system.v1","id":"system.main",
          "compounds":[{"as":"x","path":"compounds/comp.x.json"}],"links":[],"waivers":[]}"#,
    );
    write(
        dir.path(),
        "compounds/comp.x.json",
        r#"{"schema":"periodic.compound.v1","id":"comp.x","name":"x","tables_version":"v1",
          "elements":["exp.a","exp.c"]}"#,
    );

    let output = bin().arg(dir.path().join("index.json")).args(["--stdout-json"]).output().unwrap();
    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], serde_json::json!("DOMAIN_IMMISCIBLE"));
    let message = errors[0]["message"].as_str().unwrap();
    assert!(message.contains("embedded_realtime"));
    assert!(message.contains("internet_app"));
    assert!(message.find("embedded_realtime").unwrap() < message.find("internet_app").unwrap());
}

#[test]
fn dsse_sign_and_self_verify_round_trips_the_payload() {
    let dir = tempfile::tempdir().unwrap();
    write_shared_docs(dir.path());
    write_compound(dir.path(), &["exp.a", "evi.b"], "");

    let signing_key = SigningKey::generate(&mut OsRng);
    let priv_pem = signing_key.to_pkcs8_pem(LineEnding::LF).unwrap();
    let priv_path = dir.path().join("priv.pem");
    fs::write(&priv_path, priv_pem.as_str()).unwrap();

    let receipt_path = dir.path().join("receipt.json");
    let env_path = dir.path().join("env.json");

    bin()
        .arg(dir.path().join("index.json"))
        .arg("--strict")
        .arg("--trace")
        .arg("--quiet")
        .args(["--receipt-out", receipt_path.to_str().unwrap()])
        .args(["--receipt-dsse-out", env_path.to_str().unwrap()])
        .args(["--receipt-dsse-key", priv_path.to_str().unwrap()])
        .arg("--receipt-dsse-verify")
        .assert()
        .success();

    let receipt_text = fs::read_to_string(&receipt_path).unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&fs::read_to_string(&env_path).unwrap()).unwrap();

    let expected_keyid = psys_receipt::derive_keyid(&signing_key.verifying_key()).unwrap();
    assert_eq!(envelope["signatures"][0]["keyid"], serde_json::json!(expected_keyid));

    let payload_b64 = envelope["payload"].as_str().unwrap();
    let decoded = {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.decode(payload_b64).unwrap()
    };
    assert_eq!(String::from_utf8(decoded).unwrap(), receipt_text);
}
