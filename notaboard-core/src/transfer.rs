/// Workspace import and export as JSON documents.
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;

use crate::types::Workspace;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("File is not UTF-8 text: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("File is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Expected a JSON object at the top level")]
    NotAnObject,

    #[error("Missing \"projects\" field")]
    MissingProjects,

    #[error("\"projects\" must be an array")]
    ProjectsNotAnArray,

    #[error("Workspace document is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Pretty-printed JSON (2-space indent).
pub fn export_json(workspace: &Workspace) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(workspace)
}

/// `workspace-<ISO-8601>.json`, with `:` replaced so the name is portable.
pub fn export_filename(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("workspace-{}.json", stamp)
}

/// Validate and decode an exported document.
///
/// The top level must be an object with a `projects` array; everything else
/// falls back to defaults. Board invariant violations are logged but do not
/// reject the document.
pub fn import_json(bytes: &[u8]) -> Result<Workspace, ImportError> {
    let text = std::str::from_utf8(bytes)?;
    let value: serde_json::Value = serde_json::from_str(text).map_err(ImportError::InvalidJson)?;

    let object = value.as_object().ok_or(ImportError::NotAnObject)?;
    match object.get("projects") {
        None | Some(serde_json::Value::Null) => return Err(ImportError::MissingProjects),
        Some(projects) if !projects.is_array() => return Err(ImportError::ProjectsNotAnArray),
        Some(_) => {}
    }

    let workspace: Workspace = serde_json::from_value(value).map_err(ImportError::Malformed)?;
    for project in &workspace.projects {
        if let Err(e) = project.board.check_integrity() {
            warn!(
                "[notaboard.transfer.import] project {} has an inconsistent board: {}",
                project.id, e
            );
        }
    }
    Ok(workspace)
}
