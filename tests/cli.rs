//! End-to-end tests for the `generate-pdf` binary over real pipes.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run(input: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_generate-pdf"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_remove("RUST_LOG")
        .spawn()
        .expect("spawn generate-pdf");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input)
        .expect("write stdin");
    child.wait_with_output().expect("wait for generate-pdf")
}

#[test]
fn empty_input_is_rejected() {
    let out = run(b"");
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert_eq!(out.stderr, b"Error: No HTML content provided\n");
}

#[test]
fn engine_failure_is_reported() {
    let html = br#"<html><head><link rel="stylesheet" href="data:text/css;base64,!!!"></head><body><p>x</p></body></html>"#;
    let out = run(html);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.starts_with("PDF Generation Error: "), "{stderr:?}");
    assert!(stderr.ends_with('\n'));
    assert_eq!(stderr.lines().count(), 1);
}

#[test]
fn table_renders_to_pdf() {
    let out = run(
        b"<html><body><table><thead><tr><th>A</th></tr></thead><tr><td>1</td></tr></table></body></html>",
    );
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stderr.is_empty());
    assert_eq!(&out.stdout[0..5], b"%PDF-");

    let doc = lopdf::Document::load_mem(&out.stdout).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn repeated_runs_are_identical() {
    let html = b"<h1>Scope</h1><div class=\"scope\"><p>Discovery</p><p>Delivery</p></div>";
    let first = run(html);
    let second = run(html);
    assert_eq!(first.status.code(), Some(0));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn deeply_nested_markup_exits_cleanly() {
    let depth = 50_000;
    let mut html = "<div>".repeat(depth);
    html.push_str("deep");
    html.push_str(&"</div>".repeat(depth));

    let out = run(html.as_bytes());
    assert!(
        matches!(out.status.code(), Some(0) | Some(1)),
        "status {:?}, stderr {:?}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );
    if out.status.success() {
        assert_eq!(&out.stdout[0..5], b"%PDF-");
    }
}
