//! Per-step result reporting.
//!
//! Step outcomes go to stdout as one glyph line each; diagnostics go to
//! the tracing log. Keeping the two apart lets -q silence the log
//! without hiding results.

/// Print a success line for a completed step.
pub fn ok(message: &str) {
    println!("[OK] {}", message);
}

/// Print a failure line for a step that did not complete.
pub fn failed(message: &str) {
    println!("[FAILED] {}", message);
}

/// Report a step outcome and hand the flag back so call sites can
/// branch on it.
pub fn step(message: &str, success: bool) -> bool {
    if success {
        ok(message);
    } else {
        failed(message);
    }
    success
}
