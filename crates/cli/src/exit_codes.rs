//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: CI jobs rely on them.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Every selected scenario passed or was skipped                |
//! | 1    | General error (unspecified)                                  |
//! | 2    | Usage error (bad args, no scenarios found, unknown --name)   |
//! | 3    | A scenario config is invalid                                 |
//! | 4    | A scenario found discrepancies or its range had no records   |
//! | 5    | Runtime failure (workbook, sheet, address, secrets, API)     |
//!
//! When several scenarios fail, the run exits with the highest code.

/// Success - all selected scenarios passed or were skipped.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, nothing to run.
pub const EXIT_USAGE: u8 = 2;

/// Scenario TOML failed to parse or validate, or names an unknown API call.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Reconciliation found discrepancies, or the observed range was empty.
pub const EXIT_MISMATCH: u8 = 4;

/// Workbook / sheet / address / credentials / API failure.
pub const EXIT_RUNTIME: u8 = 5;

/// Stable machine-readable name for an exit code, used in JSON output.
pub fn exit_code_name(code: u8) -> &'static str {
    match code {
        EXIT_SUCCESS => "success",
        EXIT_ERROR => "error",
        EXIT_USAGE => "usage",
        EXIT_CONFIG_INVALID => "config_invalid",
        EXIT_MISMATCH => "mismatch",
        EXIT_RUNTIME => "runtime",
        _ => "error",
    }
}
