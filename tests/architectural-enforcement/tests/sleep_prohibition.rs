//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Every pause in playback goes through the pacer, so that a key
//! press can cut it short. Production code MUST NOT block a thread with
//! `std::thread::sleep`, and only `pacer.rs` may call `tokio::time::sleep`.

use architectural_enforcement::{all_production_lines, SourceLine};

/// The one file allowed to sleep
const PACER: &str = "pacer.rs";

fn is_thread_sleep(line: &SourceLine) -> bool {
    line.code.contains("thread::sleep")
}

fn is_async_sleep(line: &SourceLine) -> bool {
    line.code.contains("time::sleep") || line.code.contains("sleep_until")
}

/// Test that no production code blocks a thread with sleep
#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations: Vec<String> = all_production_lines()
        .iter()
        .filter(|line| is_thread_sleep(line))
        .map(SourceLine::describe)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: thread::sleep found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED: Pacer::pause(duration).await");

        panic!(
            "\nFound {} blocking sleep violation(s) in production code.",
            violations.len()
        );
    }
}

/// Test that only the pacer sleeps
#[test]
fn test_only_pacer_sleeps() {
    let lines = all_production_lines();

    let violations: Vec<String> = lines
        .iter()
        .filter(|line| is_async_sleep(line) && line.file_name() != PACER)
        .map(SourceLine::describe)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: sleep outside the pacer!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED: Pacer::pause(duration).await, which a key press can interrupt");

        panic!(
            "\nFound {} sleep violation(s) outside {PACER}.",
            violations.len()
        );
    }

    assert!(
        lines
            .iter()
            .any(|line| is_async_sleep(line) && line.file_name() == PACER),
        "the pacer no longer sleeps; update this test"
    );
}
