//! Diagnostic emission backend.
//!
//! All output goes through the `log` facade with the call site in front so
//! findings can be attributed without a debugger. The fatal path is the
//! termination mechanism: it logs at error level and then aborts, because a
//! detected violation means the heap can no longer be trusted.

use std::io::Write;

use super::violation::Violation;

const TARGET: &str = "guardalloc";

/// Emit a non-fatal advisory finding (leak reports).
pub(crate) fn advise(site: &str, message: std::fmt::Arguments<'_>) {
    log::warn!(target: TARGET, "[{}] {}", site, message);
}

/// Emit a debug-level note (leak-scan string sniffing, summary line).
pub(crate) fn note(message: std::fmt::Arguments<'_>) {
    log::debug!(target: TARGET, "{}", message);
}

/// Report a fatal violation and terminate the process.
///
/// Writes to stderr as well as the log facade so the report survives even
/// when no logger is installed. Never returns: the violated invariant is
/// memory safety, and there is no recovery path.
pub(crate) fn fatal(violation: &Violation) -> ! {
    log::error!(
        target: TARGET,
        "[{}][{}] {}",
        violation.site(),
        violation.code(),
        violation
    );

    let mut stderr = std::io::stderr();
    let _ = writeln!(
        stderr,
        "[guardalloc][{}] error: [{}] {}",
        violation.code(),
        violation.site(),
        violation
    );

    std::process::abort();
}
