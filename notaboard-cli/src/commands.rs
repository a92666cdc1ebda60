/// Subcommand handlers. Each one issues store mutations and prints a plain
/// text view of the result.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Subcommand;

use notaboard_core::markdown;
use notaboard_core::media;
use notaboard_core::search::{search_workspace, SearchOptions};
use notaboard_core::storage::local::FileStore;
use notaboard_core::storage::{KeyValueStore, StorageError};
use notaboard_core::transfer;
use notaboard_core::{
    ApplyError, CardPatch, Mutation, NewCard, Project, ProjectPatch, Workspace, WorkspaceStore,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Card {card_id} not found in project {project_id}")]
    CardNotFound { project_id: String, card_id: String },

    #[error("Column {column_id} not found in project {project_id}")]
    ColumnNotFound { project_id: String, column_id: String },

    #[error("Card {card_id} is not in column {column_id}")]
    CardNotInColumn { card_id: String, column_id: String },

    #[error("Refusing to delete project {0} without --yes")]
    NotConfirmed(String),

    #[error("Nothing to update: pass at least one field")]
    EmptyPatch,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List projects with card counts per column
    List,
    /// Create a project with the default three-column board
    NewProject,
    /// Edit project fields
    UpdateProject {
        project: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replace the tag list (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
        /// Image file to embed as the project cover
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, conflicts_with = "image")]
        clear_image: bool,
    },
    /// Delete a project and its board
    DeleteProject {
        project: String,
        /// Confirm the deletion
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Add a card at the top of a column
    AddCard {
        project: String,
        column: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        priority: i64,
    },
    /// Move a card to another column
    MoveCard {
        project: String,
        from: String,
        to: String,
        card: String,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Edit card fields
    UpdateCard {
        project: String,
        card: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, conflicts_with = "assignee")]
        unassign: bool,
        #[arg(long, allow_hyphen_values = true)]
        priority: Option<i64>,
    },
    /// Show a project's board
    Show {
        project: String,
        /// Render card bodies to HTML
        #[arg(long, default_value_t = false)]
        render: bool,
    },
    /// Search cards across all projects
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long, default_value_t = false)]
        case_sensitive: bool,
        #[arg(long, default_value_t = false)]
        regex: bool,
    },
    /// Write the workspace to a timestamped JSON file
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the workspace with an exported JSON file
    Import { file: PathBuf },
}

/// Settings the handlers need beyond the store itself.
pub struct Context {
    pub export_dir: PathBuf,
}

/// Open the file-backed workspace store under `data_dir`.
pub fn open_store(data_dir: &Path) -> Result<WorkspaceStore<FileStore>, CliError> {
    let storage = FileStore::new(data_dir)?;
    log::debug!("[notaboard.cli] using data dir {}", storage.dir().display());
    let store = WorkspaceStore::open(storage);
    if !store.is_persistent() {
        log::warn!("[notaboard.cli] stored workspace is unreadable, changes will not be saved");
    }
    Ok(store)
}

pub fn run<S: KeyValueStore, W: Write>(
    command: Command,
    store: &mut WorkspaceStore<S>,
    ctx: &Context,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::List => list(store.snapshot(), out),
        Command::NewProject => {
            let outcome = store.apply(Mutation::CreateProject)?;
            writeln!(out, "{}", outcome.created_id.unwrap_or_default())?;
            Ok(())
        }
        Command::UpdateProject {
            project,
            title,
            description,
            tags,
            clear_tags,
            image,
            clear_image,
        } => {
            require_project(store.snapshot(), &project)?;
            let image = match (image, clear_image) {
                (Some(path), _) => Some(Some(media::image_data_uri_from_path(&path)?)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let tags = if clear_tags {
                Some(Vec::new())
            } else if tags.is_empty() {
                None
            } else {
                Some(tags)
            };
            let patch = ProjectPatch {
                title,
                description,
                image,
                tags,
            };
            if patch.is_empty() {
                return Err(CliError::EmptyPatch);
            }
            let outcome = store.apply(Mutation::UpdateProject {
                project_id: project.clone(),
                patch,
            })?;
            if outcome.changed {
                writeln!(out, "Updated {}", project)?;
            } else {
                writeln!(out, "No change to {}", project)?;
            }
            Ok(())
        }
        Command::DeleteProject { project, yes } => {
            require_project(store.snapshot(), &project)?;
            if !yes {
                return Err(CliError::NotConfirmed(project));
            }
            store.apply(Mutation::DeleteProject {
                project_id: project.clone(),
            })?;
            writeln!(out, "Deleted {}", project)?;
            Ok(())
        }
        Command::AddCard {
            project,
            column,
            title,
            body,
            assignee,
            priority,
        } => {
            let outcome = store.apply(Mutation::AddCard {
                project_id: project,
                column_id: column,
                card: NewCard {
                    title,
                    body,
                    assignee,
                    priority,
                },
            })?;
            writeln!(out, "{}", outcome.created_id.unwrap_or_default())?;
            Ok(())
        }
        Command::MoveCard {
            project,
            from,
            to,
            card,
            index,
        } => {
            require_project(store.snapshot(), &project)?;
            let outcome = store.apply(Mutation::MoveCard {
                project_id: project.clone(),
                from_column_id: from.clone(),
                to_column_id: to.clone(),
                card_id: card.clone(),
                to_index: index,
            })?;
            if outcome.changed {
                writeln!(out, "Moved {} from {} to {}", card, from, to)?;
            } else if from == to {
                writeln!(out, "{} is already in {}", card, to)?;
            } else {
                return Err(explain_failed_move(store.snapshot(), &project, &from, &to, &card));
            }
            Ok(())
        }
        Command::UpdateCard {
            project,
            card,
            title,
            body,
            assignee,
            unassign,
            priority,
        } => {
            require_project(store.snapshot(), &project)?;
            let assignee = match (assignee, unassign) {
                (Some(user), _) => Some(Some(user)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = CardPatch {
                title,
                body,
                assignee,
                priority,
            };
            if patch.is_empty() {
                return Err(CliError::EmptyPatch);
            }
            let outcome = store.apply(Mutation::UpdateCard {
                project_id: project.clone(),
                card_id: card.clone(),
                patch,
            })?;
            if outcome.changed {
                writeln!(out, "Updated {}", card)?;
            } else if store
                .snapshot()
                .project(&project)
                .is_some_and(|p| p.board.cards.contains_key(&card))
            {
                writeln!(out, "No change to {}", card)?;
            } else {
                return Err(CliError::CardNotFound {
                    project_id: project,
                    card_id: card,
                });
            }
            Ok(())
        }
        Command::Show { project, render } => {
            let ws = store.snapshot();
            let project = require_project(ws, &project)?;
            show(ws, project, render, out)
        }
        Command::Search {
            query,
            case_sensitive,
            regex,
        } => {
            let options = SearchOptions {
                case_sensitive,
                use_regex: regex,
            };
            let hits = search_workspace(store.snapshot(), &query.join(" "), options);
            for hit in &hits {
                writeln!(
                    out,
                    "{}/{}/{}  {}  ({} / {})",
                    hit.project_id, hit.column_id, hit.card_id, hit.card_title, hit.project_title, hit.column_title
                )?;
            }
            if hits.is_empty() {
                writeln!(out, "No matching cards")?;
            }
            Ok(())
        }
        Command::Export { out: dir } => {
            let dir = dir.unwrap_or_else(|| ctx.export_dir.clone());
            let path = export_to(store.snapshot(), &dir)?;
            writeln!(out, "{}", path.display())?;
            Ok(())
        }
        Command::Import { file } => {
            let bytes = fs::read(&file)?;
            store.import(&bytes)?;
            writeln!(
                out,
                "Imported {} projects from {}",
                store.snapshot().projects.len(),
                file.display()
            )?;
            Ok(())
        }
    }
}

fn require_project<'a>(ws: &'a Workspace, project_id: &str) -> Result<&'a Project, CliError> {
    ws.project(project_id)
        .ok_or_else(|| CliError::ProjectNotFound(project_id.to_string()))
}

/// Why a move between two different columns left the board unchanged.
fn explain_failed_move(ws: &Workspace, project_id: &str, from: &str, to: &str, card_id: &str) -> CliError {
    let board = ws.project(project_id).map(|p| &p.board);
    for column_id in [from, to] {
        if board.and_then(|b| b.column(column_id)).is_none() {
            return CliError::ColumnNotFound {
                project_id: project_id.to_string(),
                column_id: column_id.to_string(),
            };
        }
    }
    if board.is_some_and(|b| b.cards.contains_key(card_id)) {
        CliError::CardNotInColumn {
            card_id: card_id.to_string(),
            column_id: from.to_string(),
        }
    } else {
        CliError::CardNotFound {
            project_id: project_id.to_string(),
            card_id: card_id.to_string(),
        }
    }
}

fn list<W: Write>(ws: &Workspace, out: &mut W) -> Result<(), CliError> {
    writeln!(out, "{} ({} projects)", ws.meta.name, ws.projects.len())?;
    for summary in ws.summaries() {
        let columns: Vec<String> = summary
            .columns
            .iter()
            .map(|c| format!("{} {}", c.title, c.card_count))
            .collect();
        let tags = if summary.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", summary.tags.join(", "))
        };
        writeln!(
            out,
            "{}  {}{}  | {}",
            summary.id,
            summary.title,
            tags,
            columns.join(" | ")
        )?;
    }
    Ok(())
}

fn show<W: Write>(ws: &Workspace, project: &Project, render: bool, out: &mut W) -> Result<(), CliError> {
    writeln!(out, "{} ({})", project.title, project.id)?;
    if !project.description.is_empty() {
        writeln!(out, "{}", project.description)?;
    }
    if !project.tags.is_empty() {
        writeln!(out, "tags: {}", project.tags.join(", "))?;
    }
    for column in &project.board.columns {
        writeln!(out)?;
        writeln!(out, "== {} [{}] ({}) ==", column.title, column.id, column.card_ids.len())?;
        for card in project.board.cards_in(column) {
            let assignee = card
                .assignee
                .as_deref()
                .map(|id| ws.user(id).map(|u| u.name.as_str()).unwrap_or(id))
                .map(|name| format!("  @{}", name))
                .unwrap_or_default();
            writeln!(out, "  {}  {}{}  p{}", card.id, card.title, assignee, card.priority)?;
            if render && !card.body.is_empty() {
                writeln!(out, "    {}", markdown::render(&card.body))?;
            }
        }
    }
    Ok(())
}

fn export_to(ws: &Workspace, dir: &Path) -> Result<PathBuf, CliError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(transfer::export_filename(Utc::now()));
    fs::write(&path, transfer::export_json(ws)?)?;
    log::info!("[notaboard.cli.export] wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notaboard_core::storage::memory::MemoryStore;
    use tempfile::TempDir;

    fn setup() -> (WorkspaceStore<MemoryStore>, Context, TempDir) {
        let tmp = TempDir::new().unwrap();
        let ctx = Context {
            export_dir: tmp.path().to_path_buf(),
        };
        (WorkspaceStore::open(MemoryStore::new()), ctx, tmp)
    }

    fn exec(store: &mut WorkspaceStore<MemoryStore>, ctx: &Context, command: Command) -> Result<String, CliError> {
        let mut out = Vec::new();
        run(command, store, ctx, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_list_seeded() {
        let (mut store, ctx, _tmp) = setup();
        let text = exec(&mut store, &ctx, Command::List).unwrap();
        assert!(text.starts_with("My Workspace (1 projects)"));
        assert!(text.contains("p_sample  Sample Project [sample]  | To Do 1 | In Progress 0 | Done 0"));
    }

    #[test]
    fn test_card_lifecycle() {
        let (mut store, ctx, _tmp) = setup();
        let pid = exec(&mut store, &ctx, Command::NewProject).unwrap().trim().to_string();

        let card = exec(
            &mut store,
            &ctx,
            Command::AddCard {
                project: pid.clone(),
                column: "todo".into(),
                title: "Write tests".into(),
                body: "**now**".into(),
                assignee: Some("u_sam".into()),
                priority: -2,
            },
        )
        .unwrap()
        .trim()
        .to_string();

        let moved = exec(
            &mut store,
            &ctx,
            Command::MoveCard {
                project: pid.clone(),
                from: "todo".into(),
                to: "done".into(),
                card: card.clone(),
                index: 0,
            },
        )
        .unwrap();
        assert!(moved.starts_with("Moved"));

        let shown = exec(
            &mut store,
            &ctx,
            Command::Show {
                project: pid.clone(),
                render: true,
            },
        )
        .unwrap();
        assert!(shown.contains(&format!("  {}  Write tests  @Sam  p-2", card)));
        assert!(shown.contains("<p><strong>now</strong></p>"));
        assert!(shown.contains("== Done [done] (1) =="));
    }

    #[test]
    fn test_move_within_column_reports_noop() {
        let (mut store, ctx, _tmp) = setup();
        let text = exec(
            &mut store,
            &ctx,
            Command::MoveCard {
                project: "p_sample".into(),
                from: "todo".into(),
                to: "todo".into(),
                card: "c_welcome".into(),
                index: 0,
            },
        )
        .unwrap();
        assert_eq!(text, "c_welcome is already in todo\n");
    }

    #[test]
    fn test_move_from_wrong_column_is_an_error() {
        let (mut store, ctx, _tmp) = setup();
        let err = exec(
            &mut store,
            &ctx,
            Command::MoveCard {
                project: "p_sample".into(),
                from: "done".into(),
                to: "todo".into(),
                card: "c_welcome".into(),
                index: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::CardNotInColumn { .. }));
        assert_eq!(err.to_string(), "Card c_welcome is not in column done");
        assert_eq!(store.version(), 0);

        let err = exec(
            &mut store,
            &ctx,
            Command::MoveCard {
                project: "p_sample".into(),
                from: "todo".into(),
                to: "backlog".into(),
                card: "c_welcome".into(),
                index: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_update_unknown_card_is_an_error() {
        let (mut store, ctx, _tmp) = setup();
        let err = exec(
            &mut store,
            &ctx,
            Command::UpdateCard {
                project: "p_sample".into(),
                card: "c404".into(),
                title: None,
                body: Some("notes".into()),
                assignee: None,
                unassign: false,
                priority: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Card c404 not found in project p_sample");
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_update_card_with_same_values_reports_no_change() {
        let (mut store, ctx, _tmp) = setup();
        let priority = store.snapshot().project("p_sample").unwrap().board.cards["c_welcome"].priority;
        let text = exec(
            &mut store,
            &ctx,
            Command::UpdateCard {
                project: "p_sample".into(),
                card: "c_welcome".into(),
                title: None,
                body: None,
                assignee: None,
                unassign: false,
                priority: Some(priority),
            },
        )
        .unwrap();
        assert_eq!(text, "No change to c_welcome\n");
    }

    #[test]
    fn test_open_store_on_unusable_dir() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();
        let err = open_store(&blocker.join("data")).err().unwrap();
        assert!(matches!(err, CliError::Storage(StorageError::Io(_))));
    }

    #[test]
    fn test_open_store_creates_and_seeds() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp.path().join("data")).unwrap();
        assert!(store.is_persistent());
        assert!(tmp.path().join("data").join("notaboard.workspace.json").exists());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut store, ctx, _tmp) = setup();
        let err = exec(
            &mut store,
            &ctx,
            Command::DeleteProject {
                project: "p_sample".into(),
                yes: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::NotConfirmed(_)));
        assert_eq!(store.snapshot().projects.len(), 1);

        exec(
            &mut store,
            &ctx,
            Command::DeleteProject {
                project: "p_sample".into(),
                yes: true,
            },
        )
        .unwrap();
        assert!(store.snapshot().projects.is_empty());
    }

    #[test]
    fn test_blank_card_title_is_rejected() {
        let (mut store, ctx, _tmp) = setup();
        let err = exec(
            &mut store,
            &ctx,
            Command::AddCard {
                project: "p_sample".into(),
                column: "todo".into(),
                title: "  ".into(),
                body: String::new(),
                assignee: None,
                priority: 0,
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Card title must not be empty");
    }

    #[test]
    fn test_update_project_image_and_tags() {
        let (mut store, ctx, tmp) = setup();
        let image = tmp.path().join("cover.png");
        fs::write(&image, b"png").unwrap();
        exec(
            &mut store,
            &ctx,
            Command::UpdateProject {
                project: "p_sample".into(),
                title: None,
                description: None,
                tags: vec!["ops".into(), "q3".into()],
                clear_tags: false,
                image: Some(image),
                clear_image: false,
            },
        )
        .unwrap();
        let project = store.snapshot().project("p_sample").unwrap();
        assert_eq!(project.tags, vec!["ops".to_string(), "q3".to_string()]);
        assert_eq!(project.image.as_deref(), Some("data:image/png;base64,cG5n"));
    }

    #[test]
    fn test_update_card_needs_a_field() {
        let (mut store, ctx, _tmp) = setup();
        let err = exec(
            &mut store,
            &ctx,
            Command::UpdateCard {
                project: "p_sample".into(),
                card: "c_welcome".into(),
                title: None,
                body: None,
                assignee: None,
                unassign: false,
                priority: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::EmptyPatch));
    }

    #[test]
    fn test_search() {
        let (mut store, ctx, _tmp) = setup();
        let text = exec(
            &mut store,
            &ctx,
            Command::Search {
                query: vec!["welcome".into()],
                case_sensitive: false,
                regex: false,
            },
        )
        .unwrap();
        assert!(text.starts_with("p_sample/todo/c_welcome  Welcome to your board"));
    }

    #[test]
    fn test_export_then_import() {
        let (mut store, ctx, _tmp) = setup();
        let path = exec(&mut store, &ctx, Command::Export { out: None })
            .unwrap()
            .trim()
            .to_string();
        assert!(path.ends_with(".json"));
        let exported = store.snapshot().clone();

        exec(&mut store, &ctx, Command::NewProject).unwrap();
        assert_eq!(store.snapshot().projects.len(), 2);

        let text = exec(&mut store, &ctx, Command::Import { file: path.into() }).unwrap();
        assert!(text.starts_with("Imported 1 projects"));
        assert_eq!(store.snapshot(), &exported);
    }

    #[test]
    fn test_import_bad_file_leaves_state() {
        let (mut store, ctx, tmp) = setup();
        let bad = tmp.path().join("bad.json");
        fs::write(&bad, r#"{"boards": []}"#).unwrap();
        let before = store.snapshot().clone();
        let err = exec(&mut store, &ctx, Command::Import { file: bad }).unwrap_err();
        assert_eq!(err.to_string(), "Import failed: Missing \"projects\" field");
        assert_eq!(store.snapshot(), &before);
    }
}
