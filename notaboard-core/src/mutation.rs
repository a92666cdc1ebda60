/// Workspace-level mutations over the project collection.
///
/// Every function takes the current snapshot by reference and returns the
/// next snapshot. The input is never modified; projects that a mutation does
/// not touch are shared with the previous snapshot through their `Arc`.
use std::sync::Arc;

use log::debug;

use crate::ids::generate_id;
use crate::types::{Project, ProjectPatch, Workspace};

pub const PROJECT_ID_PREFIX: &str = "p";

/// Copy-on-write edit of one project. Returns an unchanged copy when no
/// project matches.
pub(crate) fn with_project<F>(workspace: &Workspace, project_id: &str, edit: F) -> Workspace
where
    F: FnOnce(&mut Project),
{
    let mut next = workspace.clone();
    match next.projects.iter_mut().find(|p| p.id == project_id) {
        Some(slot) => edit(Arc::make_mut(slot)),
        None => debug!("[notaboard.mutation] project {} not found, no-op", project_id),
    }
    next
}

/// Prepend a new project with a generated id and the canonical empty board.
pub fn create_project(workspace: &Workspace) -> Workspace {
    create_project_with_id(workspace, generate_id(PROJECT_ID_PREFIX))
}

pub fn create_project_with_id(workspace: &Workspace, project_id: String) -> Workspace {
    let mut next = workspace.clone();
    next.projects.insert(0, Arc::new(Project::new(project_id)));
    next
}

/// Shallow-merge `patch` into the matching project.
pub fn update_project(workspace: &Workspace, project_id: &str, patch: &ProjectPatch) -> Workspace {
    with_project(workspace, project_id, |project| patch.apply_to(project))
}

/// Remove the project. Confirmation is the caller's job.
pub fn delete_project(workspace: &Workspace, project_id: &str) -> Workspace {
    let mut next = workspace.clone();
    next.projects.retain(|p| p.id != project_id);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{COLUMN_DONE, COLUMN_IN_PROGRESS, COLUMN_TODO};

    fn workspace_with(ids: &[&str]) -> Workspace {
        let mut ws = Workspace::default();
        for id in ids.iter().rev() {
            ws = create_project_with_id(&ws, id.to_string());
        }
        ws
    }

    #[test]
    fn test_create_project_prepends() {
        let ws = workspace_with(&["p1", "p2"]);
        let next = create_project(&ws);

        assert_eq!(next.projects.len(), 3);
        assert!(next.projects[0].id.starts_with("p_"));
        assert_eq!(next.projects[1].id, "p1");

        let board = &next.projects[0].board;
        let ids: Vec<&str> = board.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![COLUMN_TODO, COLUMN_IN_PROGRESS, COLUMN_DONE]);
        assert!(board.columns.iter().all(|c| c.card_ids.is_empty()));
        assert!(next.projects[0].tags.is_empty());

        // input snapshot untouched
        assert_eq!(ws.projects.len(), 2);
    }

    #[test]
    fn test_update_project_shallow_merge() {
        let ws = workspace_with(&["p1", "p2"]);
        let patch = ProjectPatch {
            title: Some("Renamed".into()),
            tags: Some(vec!["ops".into()]),
            ..ProjectPatch::default()
        };
        let next = update_project(&ws, "p2", &patch);

        let p2 = next.project("p2").unwrap();
        assert_eq!(p2.title, "Renamed");
        assert_eq!(p2.tags, vec!["ops".to_string()]);
        assert_eq!(p2.description, ws.project("p2").unwrap().description);
        assert_eq!(ws.project("p2").unwrap().title, "New Project");
    }

    #[test]
    fn test_update_project_shares_untouched_projects() {
        let ws = workspace_with(&["p1", "p2"]);
        let patch = ProjectPatch {
            title: Some("Renamed".into()),
            ..ProjectPatch::default()
        };
        let next = update_project(&ws, "p2", &patch);
        assert!(Arc::ptr_eq(&ws.projects[0], &next.projects[0]));
        assert!(!Arc::ptr_eq(&ws.projects[1], &next.projects[1]));
    }

    #[test]
    fn test_update_project_unknown_is_noop() {
        let ws = workspace_with(&["p1"]);
        let patch = ProjectPatch {
            title: Some("X".into()),
            ..ProjectPatch::default()
        };
        assert_eq!(update_project(&ws, "missing", &patch), ws);
    }

    #[test]
    fn test_update_project_clears_image() {
        let ws = workspace_with(&["p1"]);
        let set = ProjectPatch {
            image: Some(Some("data:image/png;base64,AA==".into())),
            ..ProjectPatch::default()
        };
        let ws = update_project(&ws, "p1", &set);
        assert!(ws.project("p1").unwrap().image.is_some());

        let clear = ProjectPatch {
            image: Some(None),
            ..ProjectPatch::default()
        };
        let ws = update_project(&ws, "p1", &clear);
        assert!(ws.project("p1").unwrap().image.is_none());
    }

    #[test]
    fn test_delete_project() {
        let ws = workspace_with(&["p1", "p2"]);
        let next = delete_project(&ws, "p1");
        assert_eq!(next.projects.len(), 1);
        assert!(next.project("p1").is_none());
        assert!(ws.project("p1").is_some());
        assert_eq!(delete_project(&next, "p1"), next);
    }
}
