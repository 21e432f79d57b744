//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for ENVKIT_QUIET, ENVKIT_LOG_LEVEL,
//! ENVKIT_LOG_JSON and ENVKIT_AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Tracing initialization mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingMode {
    /// ENVKIT_LOG_LEVEL / ENVKIT_QUIET from env
    Default,
    /// `-v/--verbose`: debug for every envkit crate
    Verbose,
}

/// Initialize tracing. Call once at process startup; later calls are no-ops.
pub fn init_tracing(mode: TracingMode) {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = filter_directive(cfg.quiet, &cfg.log_level, mode);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn filter_directive(quiet: bool, log_level: &str, mode: TracingMode) -> String {
    match mode {
        TracingMode::Verbose => "envkit=debug".to_string(),
        TracingMode::Default if quiet => "envkit=warn".to_string(),
        TracingMode::Default => log_level.to_string(),
    }
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env().audit_log.clone()?;
    if path.is_empty() {
        return None;
    }
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Audit: a subprocess is about to be spawned
pub fn audit_command_invoked(program: &str, args: &[String], cwd: Option<&Path>) {
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "command_invoked",
            "cmd": program,
            "args": args,
            "cwd": cwd.map(|p| p.display().to_string()),
        });
        append_jsonl(&path, &record);
    }
}

/// Audit: a subprocess exited (`exit_code` is None when killed by a signal)
pub fn audit_command_completed(program: &str, exit_code: Option<i32>, duration_ms: u64) {
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "command_completed",
            "cmd": program,
            "exit_code": exit_code,
            "duration_ms": duration_ms,
            "success": exit_code == Some(0),
        });
        append_jsonl(&path, &record);
    }
}

/// Audit: the provisioner entered a new phase
pub fn audit_phase(phase: &str, detail: &str) {
    tracing::debug!(phase = %phase, detail = %detail, "provision phase");
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "phase",
            "phase": phase,
            "detail": detail,
        });
        append_jsonl(&path, &record);
    }
}
