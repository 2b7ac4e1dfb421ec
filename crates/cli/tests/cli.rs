use assert_cmd::Command;
use predicates::prelude::*;

fn spendlens() -> Command {
    Command::cargo_bin("spendlens").expect("binary builds")
}

#[test]
fn decode_renders_canonical_text() {
    spendlens()
        .args(["decode", "0xff0101"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 . 1)"));
}

#[test]
fn encode_round_trips_decode() {
    spendlens()
        .args(["encode", "(q . 1)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0xff0101"));
}

#[test]
fn run_reports_result_and_cost() {
    spendlens()
        .args(["run", "--program", "(+ (q . 1) (q . 2))", "--cost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cost = ").and(predicate::str::contains("3")));
}

#[test]
fn coin_inspection_from_stdin_emits_a_report() {
    let puzzle = spendlens_core::text::parse("(q . 1)").unwrap();
    let doc = serde_json::json!({
        "coin": {
            "parent_coin_info": format!("0x{}", "11".repeat(32)),
            "puzzle_hash": hex::encode(spendlens_core::tree_hash(&puzzle)),
            "amount": 100,
        },
        "puzzle_reveal": hex::encode(spendlens_core::encode(&puzzle)),
        "solution": "0x80",
    })
    .to_string();

    spendlens()
        .args(["coin", "--coin-spend-json", "-"])
        .write_stdin(doc)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"schema_version\":\"spendlens.report.v1\"")
                .and(predicate::str::contains("\"spend_count\":1")),
        );
}

#[test]
fn missing_input_shape_fails_with_field_names() {
    spendlens()
        .args(["mempool", "--blob-json", "-"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("spend_bundle").and(predicate::str::contains("coin_spends")),
        );
}
