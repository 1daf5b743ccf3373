//! End-of-run report
//!
//! Dumps per-run KPIs when a session finishes, controlled by the
//! `DELVE_REPORT` env var:
//! - Unset → no report, zero cost
//! - `1` → human-readable to stderr
//! - `json` → JSON to stderr
//! - `json:/path` → JSON to file

use std::io::Write;

use serde::Serialize;

/// Collected metrics for one session
#[derive(Debug, Default, Clone, Serialize)]
pub struct DumpStats {
    /// Nodes that produced a fragment (markers and placeholders included)
    pub nodes_rendered: u64,
    /// Recursion markers emitted
    pub cycle_markers: u64,
    /// Containers cut off at the depth limit
    pub depth_hits: u64,
    /// Nodes refused by the call budget
    pub call_refusals: u64,
    /// Whether any governor budget tripped
    pub governor_tripped: bool,
    /// Access-path expressions built
    pub paths_emitted: u64,
    /// Fragments spilled to chunk storage
    pub chunks_spilled: u64,
    /// Bytes spilled to chunk storage
    pub chunk_bytes: u64,
    /// Wall-clock time spent walking, milliseconds
    pub wall_ms: u64,
}

/// Output format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFormat {
    Human,
    Json,
}

/// Output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDestination {
    Stderr,
    File(String),
}

/// Parsed report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub destination: ReportDestination,
}

impl ReportConfig {
    /// Parse from the DELVE_REPORT environment variable
    pub fn from_env() -> Option<Self> {
        let val = std::env::var("DELVE_REPORT").ok()?;
        match val.as_str() {
            "" | "0" => None,
            "1" => Some(ReportConfig {
                format: ReportFormat::Human,
                destination: ReportDestination::Stderr,
            }),
            "json" => Some(ReportConfig {
                format: ReportFormat::Json,
                destination: ReportDestination::Stderr,
            }),
            s if s.starts_with("json:") => Some(ReportConfig {
                format: ReportFormat::Json,
                destination: ReportDestination::File(s[5..].to_string()),
            }),
            _ => {
                tracing::warn!("DELVE_REPORT='{val}' not recognized, ignoring");
                None
            }
        }
    }
}

/// Emit the report if DELVE_REPORT asks for one. Failures are logged and
/// swallowed; reporting must never break a finished dump.
pub fn emit_if_configured(stats: &DumpStats) {
    if let Some(config) = ReportConfig::from_env() {
        emit(stats, &config);
    }
}

/// Emit the report with an explicit configuration
pub fn emit(stats: &DumpStats, config: &ReportConfig) {
    let body = match config.format {
        ReportFormat::Human => human_report(stats),
        ReportFormat::Json => match serde_json::to_string(stats) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!("report serialization failed: {err}");
                return;
            }
        },
    };
    match &config.destination {
        ReportDestination::Stderr => {
            let mut out = std::io::stderr().lock();
            let _ = writeln!(out, "{body}");
        }
        ReportDestination::File(path) => {
            if let Err(err) = std::fs::write(path, body) {
                tracing::warn!("failed to write report to {path}: {err}");
            }
        }
    }
}

fn human_report(stats: &DumpStats) -> String {
    let mut out = String::new();
    out.push_str("=== Delve Dump Report ===\n");
    out.push_str(&format!("  Nodes rendered:  {}\n", stats.nodes_rendered));
    out.push_str(&format!("  Cycle markers:   {}\n", stats.cycle_markers));
    out.push_str(&format!("  Depth cutoffs:   {}\n", stats.depth_hits));
    out.push_str(&format!("  Call refusals:   {}\n", stats.call_refusals));
    out.push_str(&format!("  Governor trip:   {}\n", stats.governor_tripped));
    out.push_str(&format!("  Paths emitted:   {}\n", stats.paths_emitted));
    out.push_str(&format!(
        "  Chunks spilled:  {} ({})\n",
        stats.chunks_spilled,
        format_bytes(stats.chunk_bytes)
    ));
    out.push_str(&format!("  Wall clock:      {} ms", stats.wall_ms));
    out
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
