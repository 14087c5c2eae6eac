//! Typed models for CC-Agency batches and pure helpers over them.

use serde::Deserialize;

use crate::api::AgencyApiError;

/// Scheduler state of a batch as reported by the agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Registered,
    Scheduled,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
    /// States introduced by newer agency versions; treated as still running.
    #[serde(other)]
    Unknown,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// A batch document from `GET /batches`.
#[derive(Debug, Clone, Deserialize)]
pub struct Batch {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "experimentId")]
    pub experiment_id: String,
    pub state: BatchState,
    /// State transition log; only present on detail responses.
    #[serde(default)]
    pub history: Vec<BatchHistoryEntry>,
}

/// One entry of a batch's state transition history.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchHistoryEntry {
    pub state: BatchState,
    pub time: Option<f64>,
    #[serde(rename = "debugInfo")]
    pub debug_info: Option<String>,
    pub description: Option<String>,
}

/// Response returned by the agency `/red` endpoint after successfully
/// registering an experiment.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the registered experiment.
    #[serde(rename = "experimentId")]
    pub experiment_id: String,
}

/// Query filter for `GET /batches`.
#[derive(Debug, Clone)]
pub enum BatchFilter {
    /// All batches belonging to one experiment.
    Experiment(String),
    /// Recent batches for a username, capped at `limit`.
    Username { username: String, limit: u32 },
}

impl BatchFilter {
    /// Render the query string parameters for this filter.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Experiment(id) => vec![("experimentId", id.clone())],
            Self::Username { username, limit } => vec![
                ("username", username.clone()),
                ("limit", limit.to_string()),
            ],
        }
    }
}

/// Enforce the 1:1 experiment-to-batch invariant on a listing result.
///
/// Zero batches means the experiment never materialized; more than one
/// means the invariant is broken. Both abort the caller's operation.
pub fn single_batch(mut batches: Vec<Batch>, experiment_id: &str) -> Result<Batch, AgencyApiError> {
    if batches.len() != 1 {
        return Err(AgencyApiError::BatchResolution {
            experiment_id: experiment_id.to_string(),
            found: batches.len(),
        });
    }
    Ok(batches.remove(0))
}

/// Pull the first non-empty diagnostic text out of a batch history.
///
/// Scans entries in original order, preferring the structured
/// `debugInfo` field over the generic `description`.
pub fn extract_history_debug_info(history: &[BatchHistoryEntry]) -> Option<String> {
    history
        .iter()
        .find_map(|entry| non_empty(entry.debug_info.as_deref()))
        .or_else(|| {
            history
                .iter()
                .find_map(|entry| non_empty(entry.description.as_deref()))
        })
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
