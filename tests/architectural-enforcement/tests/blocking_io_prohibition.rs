//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: The playback loop runs on a single-threaded runtime, so a
//! blocking call stalls the keyboard reader as well.
//! **Required**: `tokio::process` for tmux and desktop commands, `tokio::fs`
//! for the state file, run log and deck.
//! **Exception**: `config.rs`, which is loaded once before playback starts.

use architectural_enforcement::{all_production_lines, SourceLine};

/// Files allowed to use `std::fs`
const SYNC_FS_ALLOWED: &[&str] = &["config.rs"];

fn blocking_kind(line: &SourceLine) -> Option<&'static str> {
    let code = &line.code;
    if code.contains("std::process::Command") || code.contains("process::Command::new") {
        return Some("Blocking process I/O");
    }
    if code.contains("std::net::") {
        return Some("Blocking network I/O");
    }
    if code.contains("std::fs") && !SYNC_FS_ALLOWED.contains(&line.file_name()) {
        return Some("Blocking file I/O");
    }
    None
}

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter_map(|line| {
            blocking_kind(line).map(|kind| format!("{kind}: {}", line.describe()))
        })
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::process::Command::output().await");
        eprintln!("  - tokio::fs::read_to_string().await, tokio::fs::write().await");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

/// The tmux adapter must keep using the async process API
#[test]
fn test_tmux_adapter_uses_tokio_process() {
    let uses_tokio = all_production_lines()
        .iter()
        .any(|line| line.file_name() == "tmux.rs" && line.code.contains("tokio::process"));
    assert!(uses_tokio, "tmux.rs no longer uses tokio::process");
}
