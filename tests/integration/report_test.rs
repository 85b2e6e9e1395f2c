//! Report generation tests.
//!
//! Results fixtures follow the layout of the runner's cucumber JSON writer.

use login_e2e::error::HarnessError;
use login_e2e::report::{self, ReportOptions, Screenshot, Status, Summary};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::path::Path;

const RESULTS: &str = r#"[
  {
    "uri": "features/login.feature",
    "keyword": "Feature",
    "name": "Login <web>",
    "tags": [],
    "elements": [
      {
        "after": [{"result": {"status": "passed", "duration": 1000}}],
        "before": [{"result": {"status": "passed", "duration": 1000}}],
        "keyword": "Scenario",
        "type": "scenario",
        "id": "login-<web>;valid-login",
        "line": 3,
        "name": "Valid login",
        "tags": [{"name": "@smoke", "line": 2}],
        "steps": [
          {"keyword": "Given ", "line": 4, "name": "I open the login page", "hidden": false,
           "result": {"status": "passed", "duration": 5000000}},
          {"keyword": "Then ", "line": 5, "name": "I should be logged in", "hidden": false,
           "result": {"status": "passed", "duration": 5000000}}
        ]
      },
      {
        "after": [{"result": {"status": "passed", "duration": 1000}}],
        "keyword": "Scenario",
        "type": "scenario",
        "id": "login-<web>;locked-out-user",
        "line": 8,
        "name": "Locked out user",
        "tags": [],
        "steps": [
          {"keyword": "Given ", "line": 9, "name": "I open the login page", "hidden": false,
           "result": {"status": "passed", "duration": 5000000}},
          {"keyword": "Then ", "line": 10, "name": "the user \"locked_out_user\" should exist in DB",
           "hidden": false,
           "result": {"status": "failed", "duration": 5000000,
                      "error_message": "User <locked_out_user> not found in DB"}},
          {"keyword": "Then ", "line": 11, "name": "I should be logged in", "hidden": false,
           "result": {"status": "skipped", "duration": 0}},
          {"keyword": "And ", "line": 12, "name": "I wave", "hidden": false,
           "result": {"status": "undefined", "duration": 0}}
        ]
      }
    ]
  }
]"#;

fn write_fixture(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, RESULTS).unwrap();
    path
}

fn screenshot(line: usize) -> Screenshot {
    Screenshot {
        line,
        path: "screenshots/fail-1.png".into(),
        data: "iVBORw0KGgo=".to_string(),
    }
}

#[test]
fn test_summary_totals() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "login.json");
    let features = report::load_results(dir.path()).unwrap();

    assert_eq!(
        Summary::of(&features),
        Summary {
            features: 1,
            scenarios: 2,
            scenarios_passed: 1,
            scenarios_failed: 1,
            steps: 6,
            steps_passed: 3,
            steps_failed: 1,
            steps_skipped: 1,
            steps_undefined: 1,
        }
    );
    assert_eq!(features[0].status(), Status::Failed);
    assert_eq!(features[0].uri.as_deref(), Some("features/login.feature"));
}

#[test]
fn test_attach_screenshots_embeds_in_after_hook() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "login.json");

    report::attach_screenshots(&path, &[screenshot(8)]).unwrap();

    let features = report::load_results(dir.path()).unwrap();
    let [valid, locked] = &features[0].elements[..] else {
        panic!("expected two scenarios");
    };
    assert!(valid.embeddings().next().is_none());
    assert_eq!(locked.after.len(), 1);
    assert_eq!(locked.after[0].embeddings.len(), 1);
    assert_eq!(locked.after[0].embeddings[0].mime_type, "image/png");
    assert_eq!(locked.after[0].embeddings[0].data, "iVBORw0KGgo=");
}

#[test]
fn test_attach_screenshots_adds_missing_after_hook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.json");
    std::fs::write(
        &path,
        r#"[{"keyword": "Feature", "name": "Bare", "elements": [
            {"keyword": "Scenario", "name": "No hooks", "line": 2, "steps": []}]}]"#,
    )
    .unwrap();

    report::attach_screenshots(&path, &[screenshot(2)]).unwrap();

    let features = report::load_results(dir.path()).unwrap();
    let scenario = &features[0].elements[0];
    assert_eq!(scenario.after[0].result.status, Status::Passed);
    assert_eq!(scenario.embeddings().count(), 1);
}

#[test]
fn test_results_file_names_are_unique() {
    let mut taken = HashSet::new();

    let web = report::results_file_name(Path::new("features/web/login.feature"), &mut taken);
    let mobile = report::results_file_name(Path::new("features/mobile/login.feature"), &mut taken);
    let again = report::results_file_name(Path::new("features/web/login.feature"), &mut taken);

    assert_eq!(web, "features-web-login.json");
    assert_eq!(mobile, "features-mobile-login.json");
    assert_eq!(again, "features-web-login-2.json");
    assert_eq!(
        report::results_file_name(Path::new("../login.feature"), &mut taken),
        "login.json"
    );
}

#[test]
fn test_generate_writes_escaped_html() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_fixture(input.path(), "login.json");
    report::attach_screenshots(&path, &[screenshot(8)]).unwrap();

    let options = ReportOptions::new(input.path(), output.path().join("html"))
        .with_custom_data("Project", "Shop & Co")
        .with_custom_data("Cycle", "nightly");
    let path = report::generate(&options).unwrap();
    assert_eq!(path, output.path().join("html").join("index.html"));

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains(r#"<td id="scenarios-total">2</td>"#));
    assert!(html.contains(r#"<td id="scenarios-failed" class="failed">1</td>"#));
    assert!(html.contains("Login &lt;web&gt;"));
    assert!(html.contains("User &lt;locked_out_user&gt; not found in DB"));
    assert!(html.contains("Shop &amp; Co"));
    assert!(html.contains("data:image/png;base64,iVBORw0KGgo="));
    assert!(!html.contains("<web>"));
}

#[test]
fn test_generate_ignores_non_json_files() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_fixture(input.path(), "login.json");
    std::fs::write(input.path().join("notes.txt"), "not results").unwrap();

    let html_path = report::generate(&ReportOptions::new(input.path(), output.path())).unwrap();
    assert!(html_path.exists());
}

#[test]
fn test_generate_without_results_is_error() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let err = report::generate(&ReportOptions::new(input.path(), output.path())).unwrap_err();

    assert!(matches!(err, HarnessError::Report(ref m) if m.contains("No run results")));
    assert!(!output.path().join("index.html").exists());
}

#[test]
fn test_invalid_results_file_is_error() {
    let input = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("broken.json"), "{not json").unwrap();

    let err = report::load_results(input.path()).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
}
