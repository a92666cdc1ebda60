use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical column ids every new board starts with, in display order.
pub const COLUMN_TODO: &str = "todo";
pub const COLUMN_IN_PROGRESS: &str = "inprogress";
pub const COLUMN_DONE: &str = "done";

pub const DEFAULT_PROJECT_TITLE: &str = "New Project";
pub const DEFAULT_PROJECT_DESCRIPTION: &str = "Describe the project here.";

/// Explicit `null` reads as the field's default, same as a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar_color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Markdown source, rendered with [`crate::markdown::render`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    /// User id. May dangle after a user disappears.
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Display order of the column's cards.
    #[serde(default, deserialize_with = "null_as_default")]
    pub card_ids: Vec<String>,
}

impl Column {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            card_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<Column>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cards: BTreeMap<String, Card>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
    #[error("Column {column_id} lists unknown card {card_id}")]
    DanglingCardId { column_id: String, card_id: String },

    #[error("Card {card_id} appears in both {first} and {second}")]
    DuplicateCardId {
        card_id: String,
        first: String,
        second: String,
    },

    #[error("Card {0} is not listed in any column")]
    OrphanedCard(String),
}

impl Board {
    /// The canonical empty three-column board.
    pub fn with_default_columns() -> Self {
        Self {
            columns: vec![
                Column::new(COLUMN_TODO, "To Do"),
                Column::new(COLUMN_IN_PROGRESS, "In Progress"),
                Column::new(COLUMN_DONE, "Done"),
            ],
            cards: BTreeMap::new(),
        }
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn column_mut(&mut self, column_id: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == column_id)
    }

    /// Id of the column currently listing `card_id`.
    pub fn column_of(&self, card_id: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.card_ids.iter().any(|id| id == card_id))
            .map(|c| c.id.as_str())
    }

    /// Cards of a column in display order. Ids without a card are skipped.
    pub fn cards_in<'a>(&'a self, column: &'a Column) -> impl Iterator<Item = &'a Card> + 'a {
        column.card_ids.iter().filter_map(|id| self.cards.get(id))
    }

    /// Every listed id has a card, every card is listed exactly once.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for column in &self.columns {
            for card_id in &column.card_ids {
                if !self.cards.contains_key(card_id) {
                    return Err(IntegrityError::DanglingCardId {
                        column_id: column.id.clone(),
                        card_id: card_id.clone(),
                    });
                }
                if let Some(first) = seen.insert(card_id.as_str(), column.id.as_str()) {
                    return Err(IntegrityError::DuplicateCardId {
                        card_id: card_id.clone(),
                        first: first.to_string(),
                        second: column.id.clone(),
                    });
                }
            }
        }
        match self.cards.keys().find(|id| !seen.contains_key(id.as_str())) {
            Some(orphan) => Err(IntegrityError::OrphanedCard(orphan.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Data URI of the cover image, see [`crate::media::image_data_uri`].
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub board: Board,
}

impl Project {
    pub fn new(id: String) -> Self {
        Self {
            id,
            title: DEFAULT_PROJECT_TITLE.to_string(),
            description: DEFAULT_PROJECT_DESCRIPTION.to_string(),
            image: None,
            tags: Vec::new(),
            board: Board::with_default_columns(),
        }
    }
}

/// Root aggregate. Projects sit behind `Arc` so snapshots share every
/// project a mutation did not touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: WorkspaceMeta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<User>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<Arc<Project>>,
}

impl Workspace {
    /// Starting content for a store with nothing persisted yet.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let welcome = Card {
            id: "c_welcome".to_string(),
            title: "Welcome to your board".to_string(),
            body: "Cards support **markdown**:\n\n- drag cards between columns\n- edit the body to add notes".to_string(),
            assignee: Some("u_alex".to_string()),
            priority: 1,
        };

        let mut board = Board::with_default_columns();
        if let Some(todo) = board.column_mut(COLUMN_TODO) {
            todo.card_ids.push(welcome.id.clone());
        }
        board.cards.insert(welcome.id.clone(), welcome);

        let project = Project {
            id: "p_sample".to_string(),
            title: "Sample Project".to_string(),
            description: "A first project to get started.".to_string(),
            image: None,
            tags: vec!["sample".to_string()],
            board,
        };

        Self {
            meta: WorkspaceMeta {
                created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                name: "My Workspace".to_string(),
            },
            users: vec![
                User {
                    id: "u_alex".to_string(),
                    name: "Alex".to_string(),
                    role: "Owner".to_string(),
                    avatar_color: "#4f46e5".to_string(),
                },
                User {
                    id: "u_sam".to_string(),
                    name: "Sam".to_string(),
                    role: "Member".to_string(),
                    avatar_color: "#059669".to_string(),
                },
            ],
            projects: vec![Arc::new(project)],
        }
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.as_ref())
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    /// Summary of every project for list views.
    pub fn summaries(&self) -> Vec<ProjectSummary> {
        self.projects
            .iter()
            .map(|project| ProjectSummary {
                id: project.id.clone(),
                title: project.title.clone(),
                tags: project.tags.clone(),
                has_image: project.image.is_some(),
                columns: project
                    .board
                    .columns
                    .iter()
                    .map(|col| ColumnSummary {
                        id: col.id.clone(),
                        title: col.title.clone(),
                        card_count: col.card_ids.len(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Fields for a card about to be added. The id is generated on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Card title must not be empty")]
    EmptyTitle,

    #[error("Project not found: {0}")]
    UnknownProject(String),

    #[error("Column {column_id} not found in project {project_id}")]
    UnknownColumn {
        project_id: String,
        column_id: String,
    },
}

impl NewCard {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    pub fn into_card(self, id: String) -> Card {
        Card {
            id,
            title: self.title,
            body: self.body,
            assignee: self.assignee,
            priority: self.priority,
        }
    }
}

/// Shallow patch for a project. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the image.
    pub image: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.tags.is_none()
    }

    pub fn apply_to(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(image) = &self.image {
            project.image = image.clone();
        }
        if let Some(tags) = &self.tags {
            project.tags = tags.clone();
        }
    }
}

/// Shallow patch for a card. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    /// `Some(None)` unassigns the card.
    pub assignee: Option<Option<String>>,
    pub priority: Option<i64>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.assignee.is_none()
            && self.priority.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) if title.trim().is_empty() => Err(ValidationError::EmptyTitle),
            _ => Ok(()),
        }
    }

    pub fn apply_to(&self, card: &mut Card) {
        if let Some(title) = &self.title {
            card.title = title.clone();
        }
        if let Some(body) = &self.body {
            card.body = body.clone();
        }
        if let Some(assignee) = &self.assignee {
            card.assignee = assignee.clone();
        }
        if let Some(priority) = self.priority {
            card.priority = priority;
        }
    }
}

/// Summary info for a project in list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_image: bool,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub id: String,
    pub title: String,
    pub card_count: usize,
}
