//! Dump configuration
//!
//! Budgets and knobs consumed read-only by the governor, walker, and
//! chunker. A zero budget disables that check.
//!
//! ## Configuration (Environment Variables)
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DELVE_MAX_RUNTIME_SECS` | `30` | Wall-clock budget per run (0 = unlimited) |
//! | `DELVE_MEMORY_LEFT_BYTES` | `8388608` | Minimum memory headroom before tripping (0 = skip check) |
//! | `DELVE_MAX_NESTING` | `12` | Container expansion levels below the root (0 = unlimited) |
//! | `DELVE_MAX_CALLS` | `10000` | Per-run node visit budget (0 = unlimited) |
//! | `DELVE_BRIEF_LIMIT` | `64` | Characters before a rendering is clipped to brief+detail |
//! | `DELVE_TEXT_FALLBACK_CEILING` | `100000` | Max input bytes for the numeric-reference fallback |
//! | `DELVE_CHUNK_THRESHOLD` | `65536` | Fragment size above which output spills to chunk storage |
//! | `DELVE_CHUNK_RETENTION_SECS` | `300` | Age after which orphaned chunks are swept |
//! | `DELVE_CHUNK_DIR` | `$TMPDIR/delve-chunks` | Chunk storage directory |
//!
//! Invalid values fall back to the default rather than failing: a dump
//! must always be able to start.

use std::path::PathBuf;
use std::str::FromStr;

/// Process-wide dump configuration
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Wall-clock budget in seconds (0 = unlimited)
    pub max_runtime_secs: u64,
    /// Trip when discoverable memory headroom falls below this (0 = skip)
    pub memory_left_bytes: u64,
    /// Container expansion levels below the root (0 = unlimited)
    pub max_nesting_level: u32,
    /// Node visit budget per run (0 = unlimited)
    pub max_call_count: u64,
    /// Character threshold separating brief from detail forms
    pub brief_limit: usize,
    /// Input-size ceiling for the numeric-character-reference fallback
    pub text_fallback_ceiling: usize,
    /// Fragment byte size above which output spills to chunk storage
    pub chunk_threshold: usize,
    /// Age in seconds after which orphaned chunk files are swept
    pub chunk_retention_secs: u64,
    /// Chunk storage directory
    pub chunk_dir: PathBuf,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            max_runtime_secs: 30,
            memory_left_bytes: 8 * 1024 * 1024,
            max_nesting_level: 12,
            max_call_count: 10_000,
            brief_limit: 64,
            text_fallback_ceiling: 100_000,
            chunk_threshold: 64 * 1024,
            chunk_retention_secs: 300,
            chunk_dir: std::env::temp_dir().join("delve-chunks"),
        }
    }
}

impl DumpConfig {
    /// Load configuration from `DELVE_*` environment variables.
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_runtime_secs: env_or("DELVE_MAX_RUNTIME_SECS", defaults.max_runtime_secs),
            memory_left_bytes: env_or("DELVE_MEMORY_LEFT_BYTES", defaults.memory_left_bytes),
            max_nesting_level: env_or("DELVE_MAX_NESTING", defaults.max_nesting_level),
            max_call_count: env_or("DELVE_MAX_CALLS", defaults.max_call_count),
            brief_limit: env_or("DELVE_BRIEF_LIMIT", defaults.brief_limit),
            text_fallback_ceiling: env_or(
                "DELVE_TEXT_FALLBACK_CEILING",
                defaults.text_fallback_ceiling,
            ),
            chunk_threshold: env_or("DELVE_CHUNK_THRESHOLD", defaults.chunk_threshold),
            chunk_retention_secs: env_or(
                "DELVE_CHUNK_RETENTION_SECS",
                defaults.chunk_retention_secs,
            ),
            chunk_dir: std::env::var("DELVE_CHUNK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.chunk_dir),
        }
    }
}

/// Parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
