//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (unspecified)                                |
//! | 2    | Usage error (bad arguments, missing feed, bad sort key)    |
//! | 3    | Registry config or settings invalid                        |
//! | 4    | Lookup source failed; nothing changed, safe to retry       |
//! | 5    | Local storage could not be read or written                 |
//! | 6    | Shared report could not be decoded                         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Registry TOML failed to parse or validate.
pub const EXIT_CONFIG: u8 = 3;

/// Lookup source unavailable or returned garbage. State untouched.
pub const EXIT_SOURCE: u8 = 4;

/// Key-value store read/write failure.
pub const EXIT_STORAGE: u8 = 5;

/// `#rpt=` / `#report=` payload is not a valid report.
pub const EXIT_DECODE: u8 = 6;
