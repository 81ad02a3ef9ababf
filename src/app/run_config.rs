//! Run label resolution.
//!
//! At startup the agent asks a config host which collection campaign it
//! belongs to.  The answer is a JSON object mapping client ids to run
//! labels.  Any failure falls back to a default label.

use log::{info, warn};

use super::ports::RunConfigSource;
use crate::error::ConfigResolutionFailure;

/// The resolved run identity.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    label: String,
}

impl RunConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Pull the label for `client_id` out of a run-config document.
pub fn parse_label(body: &str, client_id: &str) -> Result<String, ConfigResolutionFailure> {
    let doc: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ConfigResolutionFailure::Malformed(e.to_string()))?;
    let runs = doc
        .as_object()
        .ok_or_else(|| ConfigResolutionFailure::Malformed("expected a JSON object".into()))?;
    let entry = runs
        .get(client_id)
        .ok_or_else(|| ConfigResolutionFailure::MissingKey(client_id.to_owned()))?;

    let label = match entry {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => return Err(ConfigResolutionFailure::InvalidLabel(other.to_string())),
    };
    if label.is_empty() || label.contains(['+', '#', '\0']) {
        return Err(ConfigResolutionFailure::InvalidLabel(label));
    }
    Ok(label)
}

/// Resolve the run label, falling back to `default_label` on any failure.
///
/// Never fails; the reason for a fallback is logged.
pub async fn resolve(
    source: &impl RunConfigSource,
    client_id: &str,
    default_label: &str,
) -> RunConfig {
    let outcome = match source.fetch().await {
        Ok(body) => parse_label(&body, client_id),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(label) => {
            info!("Run: set to '{}'", label);
            RunConfig::new(label)
        }
        Err(e) => {
            warn!("Run: could not resolve label ({}), using '{}'", e, default_label);
            RunConfig::new(default_label)
        }
    }
}
