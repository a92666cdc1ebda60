/// Workspace store: owns the current snapshot and applies mutations.
///
/// Each `apply` that changes the workspace replaces the snapshot, bumps the
/// version counter and persists the new snapshot. Persistence is
/// fire-and-forget: a failed write is logged and the in-memory state is kept.
/// A stored document that cannot be read is never overwritten: the session
/// runs in memory only until an explicit import replaces the workspace.
use chrono::Utc;
use log::{debug, info, warn};

use crate::board;
use crate::ids::generate_id;
use crate::mutation;
use crate::storage::{self, KeyValueStore, STORAGE_KEY};
use crate::transfer::{self, ImportError};
use crate::types::{CardPatch, NewCard, ProjectPatch, ValidationError, Workspace};

/// One data-store operation, as issued by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateProject,
    UpdateProject {
        project_id: String,
        patch: ProjectPatch,
    },
    DeleteProject {
        project_id: String,
    },
    AddCard {
        project_id: String,
        column_id: String,
        card: NewCard,
    },
    MoveCard {
        project_id: String,
        from_column_id: String,
        to_column_id: String,
        card_id: String,
        to_index: usize,
    },
    UpdateCard {
        project_id: String,
        card_id: String,
        patch: CardPatch,
    },
    ReplaceWorkspace(Workspace),
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),
}

/// What an `apply` call did.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// Store version after the call.
    pub version: u64,
    /// Whether a new snapshot was produced.
    pub changed: bool,
    /// Id of the project or card the mutation created, if any.
    pub created_id: Option<String>,
}

pub struct WorkspaceStore<S: KeyValueStore> {
    storage: S,
    key: String,
    current: Workspace,
    version: u64,
    persistent: bool,
}

impl<S: KeyValueStore> WorkspaceStore<S> {
    /// Load the persisted workspace, or seed a fresh one when nothing is
    /// stored yet. When the stored document cannot be read the seed stays in
    /// memory and the store is left read-only.
    pub fn open(storage: S) -> Self {
        Self::open_with_key(storage, STORAGE_KEY)
    }

    pub fn open_with_key(storage: S, key: &str) -> Self {
        match storage::load_workspace(&storage, key) {
            Ok(Some(workspace)) => {
                info!(
                    "[notaboard.store] loaded workspace with {} projects",
                    workspace.projects.len()
                );
                Self::with_workspace(storage, key, workspace)
            }
            Ok(None) => {
                info!("[notaboard.store] no stored workspace, seeding a new one");
                let store = Self::with_workspace(storage, key, Workspace::seeded(Utc::now()));
                store.persist();
                store
            }
            Err(e) => {
                warn!(
                    "[notaboard.store] failed to load workspace from {}: {}; continuing in memory only",
                    key, e
                );
                let mut store = Self::with_workspace(storage, key, Workspace::seeded(Utc::now()));
                store.persistent = false;
                store
            }
        }
    }

    pub fn with_workspace(storage: S, key: &str, workspace: Workspace) -> Self {
        Self {
            storage,
            key: key.to_string(),
            current: workspace,
            version: 0,
            persistent: true,
        }
    }

    pub fn snapshot(&self) -> &Workspace {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// False after a failed load, until an import replaces the workspace.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Validate and apply one mutation.
    pub fn apply(&mut self, op: Mutation) -> Result<ApplyOutcome, ApplyError> {
        let ws = &self.current;
        let (next, created_id) = match op {
            Mutation::CreateProject => {
                let id = generate_id(mutation::PROJECT_ID_PREFIX);
                (mutation::create_project_with_id(ws, id.clone()), Some(id))
            }
            Mutation::UpdateProject { project_id, patch } => {
                if patch.is_empty() {
                    return Ok(self.unchanged());
                }
                (mutation::update_project(ws, &project_id, &patch), None)
            }
            Mutation::DeleteProject { project_id } => (mutation::delete_project(ws, &project_id), None),
            Mutation::AddCard {
                project_id,
                column_id,
                card,
            } => {
                card.validate()?;
                let project = ws
                    .project(&project_id)
                    .ok_or_else(|| ValidationError::UnknownProject(project_id.clone()))?;
                if project.board.column(&column_id).is_none() {
                    return Err(ValidationError::UnknownColumn {
                        project_id,
                        column_id,
                    }
                    .into());
                }
                let id = generate_id(board::CARD_ID_PREFIX);
                (
                    board::add_card_with_id(ws, &project_id, &column_id, id.clone(), card),
                    Some(id),
                )
            }
            Mutation::MoveCard {
                project_id,
                from_column_id,
                to_column_id,
                card_id,
                to_index,
            } => {
                if from_column_id == to_column_id {
                    debug!("[notaboard.store] move within {} skipped", from_column_id);
                    return Ok(self.unchanged());
                }
                (
                    board::move_card(ws, &project_id, &from_column_id, &to_column_id, &card_id, to_index),
                    None,
                )
            }
            Mutation::UpdateCard {
                project_id,
                card_id,
                patch,
            } => {
                patch.validate()?;
                (board::update_card(ws, &project_id, &card_id, &patch), None)
            }
            Mutation::ReplaceWorkspace(workspace) => (workspace, None),
        };

        if next == self.current {
            debug!("[notaboard.store] mutation left the workspace unchanged");
            return Ok(self.unchanged());
        }

        self.commit(next);
        Ok(ApplyOutcome {
            version: self.version,
            changed: true,
            created_id,
        })
    }

    /// Replace the workspace with an imported document. On error the
    /// current snapshot is left untouched.
    pub fn import(&mut self, bytes: &[u8]) -> Result<ApplyOutcome, ApplyError> {
        let workspace = transfer::import_json(bytes)?;
        info!(
            "[notaboard.store] importing workspace with {} projects",
            workspace.projects.len()
        );
        if !self.persistent {
            info!("[notaboard.store] import replaces the unreadable stored workspace");
            self.persistent = true;
        }
        self.apply(Mutation::ReplaceWorkspace(workspace))
    }

    fn unchanged(&self) -> ApplyOutcome {
        ApplyOutcome {
            version: self.version,
            changed: false,
            created_id: None,
        }
    }

    fn commit(&mut self, next: Workspace) {
        self.current = next;
        self.version += 1;
        self.persist();
    }

    fn persist(&self) {
        if !self.persistent {
            debug!("[notaboard.store] persistence disabled, keeping changes in memory");
            return;
        }
        if let Err(e) = storage::save_workspace(&self.storage, &self.key, &self.current) {
            warn!("[notaboard.store] failed to persist workspace: {}", e);
        }
    }
}
