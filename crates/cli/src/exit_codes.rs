//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 60-69   | match     | Matching run outcomes                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use guestlink_matcher::MatchError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Match (60-69)
// =============================================================================

/// Config file failed to parse or validate, or names an unknown algorithm.
pub const EXIT_MATCH_INVALID_CONFIG: u8 = 60;

/// Input could not be read: missing file, missing mapped column, write failure.
pub const EXIT_MATCH_RUNTIME: u8 = 61;

/// `--strict` was given and unmatched rows remain on either side.
pub const EXIT_MATCH_UNMATCHED: u8 = 62;

/// Algorithm is known but its capability is not available in this build.
pub const EXIT_MATCH_UNAVAILABLE: u8 = 63;

/// Run stopped before completion (`--timeout` elapsed). Partial output was written.
pub const EXIT_MATCH_CANCELLED: u8 = 64;

/// Map an engine error to its exit code.
pub fn match_exit_code(err: &MatchError) -> u8 {
    match err {
        MatchError::ConfigParse(_)
        | MatchError::ConfigValidation(_)
        | MatchError::UnknownAlgorithm(_) => EXIT_MATCH_INVALID_CONFIG,
        MatchError::Unavailable { .. } => EXIT_MATCH_UNAVAILABLE,
        MatchError::MissingColumn { .. } | MatchError::Io(_) | MatchError::Hook { .. } => {
            EXIT_MATCH_RUNTIME
        }
        MatchError::Embedding(_) => EXIT_ERROR,
    }
}
