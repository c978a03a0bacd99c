//! `arena reconcile --before F --after F`

use anyhow::{Context, Result};
use arena_reconcile::{reconcile_report, stamp};
use arena_schemas::GameDocument;
use chrono::{DateTime, Utc};
use serde_json::json;

use super::read_json_file;

/// Print the fired rules and the patch for one `before -> after` change.
pub fn run(before_path: &str, after_path: &str, now: Option<String>) -> Result<()> {
    let before = GameDocument::from_json(read_json_file(before_path)?)
        .with_context(|| format!("decode game document: {before_path}"))?;
    let after = GameDocument::from_json(read_json_file(after_path)?)
        .with_context(|| format!("decode game document: {after_path}"))?;

    let report = reconcile_report(&before, &after);
    let patch = match now {
        Some(raw) => {
            let t = DateTime::parse_from_rfc3339(&raw)
                .with_context(|| format!("invalid --now '{raw}' (RFC 3339 expected)"))?
                .with_timezone(&Utc);
            stamp(report.patch, t)
        }
        None => report.patch,
    };

    let fired: Vec<&str> = report.fired.iter().map(|r| r.as_str()).collect();
    let out = json!({
        "fired": fired,
        "requires_write": !patch.is_empty(),
        "patch": patch.to_field_map(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
