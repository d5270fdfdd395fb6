//! Integration tests for the camber CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a camber command
fn camber() -> Command {
    Command::cargo_bin("camber").unwrap()
}

/// Helper to create a workspace with a small pipe/flange catalog
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    camber()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success();

    fs::write(
        tmp.path().join("catalog/parts/pipe-dn50.yaml"),
        r#"part_id: PIPE-DN50
family: pipe
dn: 50
std: "ASME B36.10"
ports:
  - port_type: bore
    axis: { x: 0.0, y: 0.0, z: 1.0 }
    origin: { x: 0.0, y: 0.0, z: 100.0 }
    dn: 50
stock_qty: 4
"#,
    )
    .unwrap();

    fs::write(
        tmp.path().join("catalog/parts/flange-dn50.yaml"),
        r#"part_id: FLANGE-DN50-PN16-RF
family: flange
dn: 50
pn: 16
face_type: rf
std: "ASME B16.5"
ports:
  - port_type: face
    axis: { x: 0.0, y: 0.0, z: -1.0 }
    origin: { x: 0.0, y: 0.0, z: 100.0 }
    dn: 50
    face_type: rf
stock_qty: 2
"#,
    )
    .unwrap();

    fs::write(
        tmp.path().join("catalog/templates/pipe-flange.yaml"),
        r#"template_id: PIPE_FLANGE_DN50_PN16
family_a: pipe
family_b: flange
dn: 50
pn: 16
join_rule: coaxial+plane_coincident
mate_schema:
  axis_align: true
  angle_tol_deg: 2.0
  gap_tol_mm: 0.1
  face_offset_mm: 0.0
fasteners:
  bolt_count: 4
  bolt_spec: M16
  pcd_mm: "125+(dn-50)*2.5"
  gasket: true
"#,
    )
    .unwrap();

    tmp
}

/// Helper to create a task and return its id
fn create_task(tmp: &TempDir, bom: &str) -> String {
    let bom_path = tmp.path().join("bom.csv");
    fs::write(&bom_path, bom).unwrap();

    let output = camber()
        .current_dir(tmp.path())
        .args(["task", "new", "--name", "spool-7", "--bom", "bom.csv"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .find(|w| w.starts_with("TASK-"))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Helper to pull the one constraint id out of the constraints directory
fn constraint_id(tmp: &TempDir) -> String {
    let entry = fs::read_dir(tmp.path().join("constraints"))
        .unwrap()
        .next()
        .expect("no constraint files")
        .unwrap();
    entry
        .file_name()
        .to_string_lossy()
        .trim_end_matches(".camber.yaml")
        .to_string()
}

#[test]
fn test_init_creates_workspace() {
    let tmp = TempDir::new().unwrap();
    camber()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized camber workspace"));

    assert!(tmp.path().join(".camber/config.yaml").exists());
    assert!(tmp.path().join("catalog/standards.yaml").exists());
    assert!(tmp.path().join("constraints").is_dir());
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = TempDir::new().unwrap();
    camber()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success();
    camber()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_fail_outside_workspace() {
    let tmp = TempDir::new().unwrap();
    camber()
        .current_dir(tmp.path())
        .args(["parts", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a camber workspace"));
}

#[test]
fn test_parts_list_and_show() {
    let tmp = setup_workspace();

    camber()
        .current_dir(tmp.path())
        .args(["parts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PIPE-DN50"))
        .stdout(predicate::str::contains("flange"));

    camber()
        .current_dir(tmp.path())
        .args(["parts", "show", "FLANGE-DN50-PN16-RF"])
        .assert()
        .success()
        .stdout(predicate::str::contains("face_type: rf"));
}

#[test]
fn test_parts_index_writes_corpus() {
    let tmp = setup_workspace();
    camber()
        .current_dir(tmp.path())
        .args(["parts", "index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 2 parts"));

    assert!(tmp
        .path()
        .join("corpus/PIPE-DN50.camber.yaml")
        .exists());
}

#[test]
fn test_infer_creates_constraint_with_evaluated_formula() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n");

    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inferred 1 constraints"))
        .stdout(predicate::str::contains("PIPE_FLANGE_DN50_PN16"));

    let id = constraint_id(&tmp);
    let content =
        fs::read_to_string(tmp.path().join(format!("constraints/{}.camber.yaml", id))).unwrap();
    // dn=50 puts the formula at its base value
    assert!(content.contains("pcd_mm: 125.0"));
    assert!(content.contains("bolt_material: A193 B7"));
    assert!(content.contains("review_status: pending"));
}

#[test]
fn test_infer_resolves_free_text_names() {
    let tmp = setup_workspace();
    let task_id = create_task(
        &tmp,
        "part_id,raw_name,qty\nPIPE-DN50,,1\n,50mm rf flange pn16,1\n",
    );

    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 resolved, 0 orphans"));

    // The observed name enters the corpus at count 1
    let corpus_path = tmp.path().join("corpus/dn50-rf-flange-pn16.camber.yaml");
    let content = fs::read_to_string(&corpus_path).unwrap();
    assert!(content.contains("raw_name: 50mm rf flange pn16"));
    assert!(content.contains("part_id: FLANGE-DN50-PN16-RF"));
    assert!(content.contains("family: flange"));
    assert!(content.contains("occurrence_count: 1"));

    // Seeing the same name again bumps the count
    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success();
    let content = fs::read_to_string(&corpus_path).unwrap();
    assert!(content.contains("occurrence_count: 2"));
}

#[test]
fn test_line_class_selects_standards_row() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("catalog/standards.yaml"),
        r#"rows:
  - line_class: DEFAULT
    bolt_material: "A193 B7"
    gasket_type: spiral_wound
  - line_class: LC-B2
    bolt_material: "Q235 8.8"
    gasket_type: flat_ring
"#,
    )
    .unwrap();

    let bom_path = tmp.path().join("bom.csv");
    fs::write(&bom_path, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n").unwrap();
    let output = camber()
        .current_dir(tmp.path())
        .args([
            "task", "new", "--name", "lc-spool", "--bom", "bom.csv", "--line-class", "LC-B2",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let task_id = stdout
        .split_whitespace()
        .find(|w| w.starts_with("TASK-"))
        .unwrap();

    camber()
        .current_dir(tmp.path())
        .args(["infer", task_id])
        .assert()
        .success();

    let id = constraint_id(&tmp);
    let content =
        fs::read_to_string(tmp.path().join(format!("constraints/{}.camber.yaml", id))).unwrap();
    assert!(content.contains("bolt_material: Q235 8.8"));
    assert!(content.contains("gasket_type: flat_ring"));
}

#[test]
fn test_corrupt_template_aborts_inference() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n");
    fs::write(
        tmp.path().join("catalog/templates/broken.yaml"),
        "template_id: [unclosed\n",
    )
    .unwrap();

    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.yaml"));
}

#[test]
fn test_infer_reports_orphans() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nVALVE-DN999,1\n");

    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 orphans"))
        .stdout(predicate::str::contains("VALVE-DN999"));
}

#[test]
fn test_review_approve_then_idempotent() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n");
    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success();
    let id = constraint_id(&tmp);

    camber()
        .current_dir(tmp.path())
        .args(["review", "approve", &id, "--reviewer", "pk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("approve"));

    // Pattern learned from the approval
    camber()
        .current_dir(tmp.path())
        .args(["pattern", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pipe/flange"))
        .stdout(predicate::str::contains("PIPE_FLANGE_DN50_PN16"));

    // Approving again is a no-op, not an error
    camber()
        .current_dir(tmp.path())
        .args(["review", "approve", &id, "--expect", "approved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already approved"));
}

#[test]
fn test_stale_review_fails() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n");
    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success();
    let id = constraint_id(&tmp);

    camber()
        .current_dir(tmp.path())
        .args(["review", "reject", &id])
        .assert()
        .success();

    // A second reviewer still expecting pending gets a stale error
    camber()
        .current_dir(tmp.path())
        .args(["review", "reject", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stale review"));
}

#[test]
fn test_report_generate_with_markdown_output() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n");
    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success();
    let id = constraint_id(&tmp);
    camber()
        .current_dir(tmp.path())
        .args(["review", "approve", &id])
        .assert()
        .success();

    camber()
        .current_dir(tmp.path())
        .args(["report", "generate", &task_id, "--output", "report.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report RPT-"));

    let md = fs::read_to_string(tmp.path().join("report.md")).unwrap();
    assert!(md.contains("# Validation report RPT-"));
    assert!(md.contains("## connectivity"));
    assert!(md.contains("Suggested assembly sequence"));

    camber()
        .current_dir(tmp.path())
        .args(["report", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RPT-"));
}

#[test]
fn test_task_new_rejects_unusable_csv() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("bad.csv"), "foo,bar\nx,y\n").unwrap();
    camber()
        .current_dir(tmp.path())
        .args(["task", "new", "--name", "t", "--bom", "bad.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("part_id or raw_name"));
}

#[test]
fn test_infer_is_deterministic_for_superseded_runs() {
    let tmp = setup_workspace();
    let task_id = create_task(&tmp, "part_id,qty\nPIPE-DN50,1\nFLANGE-DN50-PN16-RF,1\n");

    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success();
    camber()
        .current_dir(tmp.path())
        .args(["infer", &task_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("superseded 1 earlier constraints"));

    // Two constraint files now: the superseded one and its replacement
    let count = fs::read_dir(tmp.path().join("constraints")).unwrap().count();
    assert_eq!(count, 2);
}
