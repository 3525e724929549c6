// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use folio::util::test_fixtures::TestFixtureRoot;
use std::fs;
use std::path::Path;
use std::process::Command;

fn run_cli(root: &Path, args: &[&str]) -> std::process::Output {
    let binary = env!("CARGO_BIN_EXE_folio");
    Command::new(binary)
        .arg("-C")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run folio cli")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn put_list_cat_and_remove() {
    let fixture = TestFixtureRoot::new_unique("cli-e2e-basic").unwrap();
    let root = fixture.path().join("runtime");
    let source = fixture.path().join("hello.md");
    fs::write(&source, "# Hello\n\nFrom the command line.").unwrap();

    let output = run_cli(&root, &["put", source.to_str().unwrap(), "--as", "docs/hello.md"]);
    assert!(output.status.success(), "{:?}", output);
    assert!(stdout(&output).contains("stored docs/hello.md"));

    let output = run_cli(&root, &["list", "--json"]);
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["path"], "docs/hello.md");
    assert_eq!(listed[0]["category"], "markdown");

    let output = run_cli(&root, &["cat", "docs/hello.html"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("<h1>Hello</h1>"));

    let output = run_cli(&root, &["rm", "docs/hello.md"]);
    assert!(output.status.success());
    let output = run_cli(&root, &["cat", "docs/hello.md"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn export_and_import_between_roots() {
    let fixture = TestFixtureRoot::new_unique("cli-e2e-bundle").unwrap();
    let first = fixture.path().join("first");
    let second = fixture.path().join("second");
    let page = fixture.path().join("index.md");
    let style = fixture.path().join("site.css");
    fs::write(&page, "# Home").unwrap();
    fs::write(&style, "body{}").unwrap();

    assert!(run_cli(&first, &["put", page.to_str().unwrap()]).status.success());
    assert!(run_cli(&first, &["put", style.to_str().unwrap()]).status.success());

    let bundle = fixture.path().join("site.zip");
    let output = run_cli(&first, &["export", bundle.to_str().unwrap()]);
    assert!(output.status.success(), "{:?}", output);
    assert!(stdout(&output).contains("exported 1 pages"));

    let output = run_cli(&second, &["import", bundle.to_str().unwrap()]);
    assert!(output.status.success(), "{:?}", output);

    let before = run_cli(&first, &["list", "--json"]);
    let after = run_cli(&second, &["list", "--json"]);
    let before: serde_json::Value = serde_json::from_slice(&before.stdout).unwrap();
    let after: serde_json::Value = serde_json::from_slice(&after.stdout).unwrap();
    assert_eq!(before[0]["path"], after[0]["path"]);
    assert_eq!(before[0]["size"], after[0]["size"]);
    assert!(second.join("static").join("site.css").is_file());
}

#[test]
fn usage_errors_exit_with_two() {
    let fixture = TestFixtureRoot::new_unique("cli-e2e-usage").unwrap();
    let output = run_cli(fixture.path(), &["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));

    let output = run_cli(fixture.path(), &["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage: folio"));
}

#[test]
fn memory_backend_is_refused_by_the_command() {
    let fixture = TestFixtureRoot::new_unique("cli-e2e-memory").unwrap();
    fs::write(
        fixture.path().join("config.yaml"),
        "storage:\n  backend: memory\n",
    )
    .unwrap();

    let output = run_cli(fixture.path(), &["list"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("memory"));
}
