//! JSON output helpers.
//!
//! Provides the error-object formatter used by `--json` when a command fails
//! before provisioning starts, and the run report and plan documents.

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::domain::templates::RenderedFile;
use crate::domain::{ProvisioningConfig, RunReport, StepId};
use crate::output::human::STDERR_TAIL_LINES;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format the report of a provisioning run.
///
/// `failure` is `null` on success; otherwise it names the step and, for
/// command failures, the command, its exit indication and the stderr tail.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_report(report: &RunReport, cfg: &ProvisioningConfig) -> Result<String> {
    let failure = report.failure().map_or(Value::Null, |(step, err)| {
        let mut obj = json!({
            "step": step,
            "code": err.code(),
            "message": err.to_string(),
        });
        if let Some(f) = err.command_failure() {
            obj["command"] = json!(f.command);
            obj["exit"] = json!(f.exit.to_string());
            obj["stderr_tail"] = json!(f.stderr_tail(STDERR_TAIL_LINES));
        }
        obj
    });

    let obj = json!({
        "complete": report.is_complete(),
        "url": cfg.https_url(),
        "steps": report.results,
        "failure": failure,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format the dry-run plan.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_plan(cfg: &ProvisioningConfig, files: &[RenderedFile]) -> Result<String> {
    let steps: Vec<Value> = StepId::ALL
        .iter()
        .map(|step| {
            json!({
                "number": step.number(),
                "step": step,
                "label": step.label(),
            })
        })
        .collect();
    let files: Vec<Value> = files
        .iter()
        .map(|f| {
            json!({
                "path": f.path.display().to_string(),
                "content": f.content,
            })
        })
        .collect();

    let obj = json!({
        "domain": cfg.domain_name,
        "url": cfg.https_url(),
        "steps": steps,
        "files": files,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
