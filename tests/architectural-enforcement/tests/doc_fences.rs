//! Integration Test: Doc Comment Fences
//!
//! **Policy**: Module and item docs that quote a deck show the deck's own
//! fenced blocks, so the outer fence MUST be wider than the ones it quotes.
//! A same-width fence ends the outer block early and rustdoc then compiles
//! the rest of the slide as a Rust doctest.

use architectural_enforcement::{doc_fence_problems, rust_files, workspace_root, PRODUCTION_DIRS};

/// Test that every doc comment fence nests and closes
#[test]
fn test_doc_fences_are_balanced() {
    let root = workspace_root();
    let violations: Vec<String> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_files(&root.join(dir)))
        .flat_map(|file| doc_fence_problems(&file))
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: broken code fences in doc comments!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED: quote fenced blocks inside a wider fence (```` ````text ````)");

        panic!(
            "\nFound {} doc fence violation(s) in production code.",
            violations.len()
        );
    }
}
