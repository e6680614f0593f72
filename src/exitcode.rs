//! Exit codes
//!
//! 1-3 are the stack-specific codes; the rest follow BSD sysexits.h.

/// Successful termination
pub const OK: i32 = 0;

/// User declined an action, or no container runtime is installed
pub const DECLINED: i32 = 1;

/// Compose tool missing or too old, runtime unreachable, compose command failed
pub const RUNTIME_FAILURE: i32 = 2;

/// Stack not configured and setup was declined
pub const UNCONFIGURED: i32 = 3;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error
pub const DATAERR: i32 = 65;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
