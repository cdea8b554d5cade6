//! End-to-end runs of the `pdfmerger` binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

use crate::common::{CONCAT_TOOL, FAILING_TOOL, content_of, write_tool};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("in")).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn input(&self, name: &str) -> String {
        let path = self.path().join("in").join(name);
        std::fs::write(&path, content_of(name)).unwrap();
        path.display().to_string()
    }

    fn run(&self, tool: &str, args: &[&str]) -> Output {
        let script = write_tool(self.path(), tool);
        Command::new(env!("CARGO_BIN_EXE_pdfmerger"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .env_remove("PDFMERGER_CONFIG")
            .args(["--tool", "/bin/sh"])
            .args(["--tool-arg", script.to_str().unwrap()])
            .args(["--tool-arg", "{output}", "--tool-arg", "{inputs}"])
            .args(["--storage-root", self.path().join("tmp").to_str().unwrap()])
            .args(args)
            .output()
            .unwrap()
    }

    fn storage_is_empty(&self) -> bool {
        std::fs::read_dir(self.path().join("tmp")).unwrap().next().is_none()
    }
}

#[test]
fn test_merge_to_output_file() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");
    let b = ws.input("b.pdf");
    let out = ws.path().join("book.pdf");

    let output = ws.run(CONCAT_TOOL, &[&b, &a, "-o", out.to_str().unwrap(), "-q"]);
    assert!(output.status.success(), "{output:?}");

    let merged = std::fs::read_to_string(&out).unwrap();
    assert_eq!(merged, format!("{}{}", content_of("b.pdf"), content_of("a.pdf")));
    assert!(ws.storage_is_empty());
}

#[test]
fn test_generated_name_in_current_dir() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");
    let b = ws.input("b.pdf");

    let output = ws.run(CONCAT_TOOL, &[&a, &b, "-q"]);
    assert!(output.status.success(), "{output:?}");
    assert!(ws.path().join("a_and_b_merged.pdf").is_file());
}

#[test]
fn test_order_flag() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");
    let b = ws.input("b.pdf");
    let c = ws.input("c.pdf");
    let out = ws.path().join("out.pdf");

    let output = ws.run(
        CONCAT_TOOL,
        &[&a, &b, &c, "--order", "c.pdf,a.pdf,b.pdf", "-o", out.to_str().unwrap(), "-q"],
    );
    assert!(output.status.success(), "{output:?}");

    let merged = std::fs::read_to_string(&out).unwrap();
    let expected: String = ["c.pdf", "a.pdf", "b.pdf"].iter().map(|n| content_of(n)).collect();
    assert_eq!(merged, expected);
}

#[test]
fn test_rejected_input_fails_and_cleans_up() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");
    let notes = ws.input("notes.txt");

    let output = ws.run(CONCAT_TOOL, &[&a, &notes, "-q"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("notes.txt"));
    assert!(ws.storage_is_empty());
}

#[test]
fn test_continue_on_error_with_json_report() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");
    let notes = ws.input("notes.txt");
    let out = ws.path().join("out.pdf");

    let output = ws.run(
        CONCAT_TOOL,
        &[&a, &notes, "--continue-on-error", "--json", "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["uploaded"].as_array().unwrap().len(), 1);
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);
    assert_eq!(report["merge"]["filename"], "a_merged.pdf");
    assert_eq!(report["merge"]["mergedFiles"][0], "a.pdf");
    assert_eq!(report["dryRun"], false);
}

#[test]
fn test_dry_run_leaves_nothing_behind() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");

    let output = ws.run(CONCAT_TOOL, &[&a, "-n"]);
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("a_merged.pdf"));
    assert!(!ws.path().join("a_merged.pdf").exists());
    assert!(ws.storage_is_empty());
}

#[test]
fn test_no_clobber() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");
    let out = ws.path().join("out.pdf");
    std::fs::write(&out, b"keep me").unwrap();

    let output = ws.run(CONCAT_TOOL, &[&a, "-o", out.to_str().unwrap(), "--no-clobber"]);
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(std::fs::read(&out).unwrap(), b"keep me");
    assert!(ws.storage_is_empty());

    let output = ws.run(CONCAT_TOOL, &[&a, "-o", out.to_str().unwrap(), "-f", "-q"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(std::fs::read_to_string(&out).unwrap(), content_of("a.pdf"));
}

#[test]
fn test_tool_failure_exit_code() {
    let ws = Workspace::new();
    let a = ws.input("a.pdf");

    let output = ws.run(FAILING_TOOL, &[&a, "-q"]);
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error code: 3"));
    assert!(ws.storage_is_empty());
}
