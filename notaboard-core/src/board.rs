/// Card mutations on a single project's board.
///
/// Same contract as [`crate::mutation`]: snapshot in, new snapshot out.
/// Every operation keeps the board invariant (each card listed in exactly
/// one column, every listed id backed by a card) by refusing to act when a
/// referenced column or card is missing.
use log::debug;

use crate::ids::generate_id;
use crate::mutation::with_project;
use crate::types::{Board, CardPatch, NewCard, Workspace};

pub const CARD_ID_PREFIX: &str = "c";

/// Insert a new card at the head of `column_id`. Silently a no-op when the
/// project or column does not exist.
pub fn add_card(workspace: &Workspace, project_id: &str, column_id: &str, fields: NewCard) -> Workspace {
    add_card_with_id(workspace, project_id, column_id, generate_id(CARD_ID_PREFIX), fields)
}

/// [`add_card`] with a caller-chosen id. A no-op when the board already
/// holds a card with that id.
pub fn add_card_with_id(
    workspace: &Workspace,
    project_id: &str,
    column_id: &str,
    card_id: String,
    fields: NewCard,
) -> Workspace {
    with_project(workspace, project_id, |project| {
        insert_card(&mut project.board, column_id, card_id, fields)
    })
}

fn insert_card(board: &mut Board, column_id: &str, card_id: String, fields: NewCard) {
    if board.cards.contains_key(&card_id) {
        debug!("[notaboard.board] add_card: id {} already taken", card_id);
        return;
    }
    let Some(column) = board.column_mut(column_id) else {
        debug!("[notaboard.board] add_card: column {} not found", column_id);
        return;
    };
    column.card_ids.insert(0, card_id.clone());
    board.cards.insert(card_id.clone(), fields.into_card(card_id));
}

/// Move `card_id` from one column to position `to_index` of another.
///
/// An index past the end appends. Skipping the call when `from == to` is
/// left to the caller; here it simply reorders within the column.
pub fn move_card(
    workspace: &Workspace,
    project_id: &str,
    from_column_id: &str,
    to_column_id: &str,
    card_id: &str,
    to_index: usize,
) -> Workspace {
    with_project(workspace, project_id, |project| {
        relocate_card(&mut project.board, from_column_id, to_column_id, card_id, to_index)
    })
}

fn relocate_card(board: &mut Board, from_column_id: &str, to_column_id: &str, card_id: &str, to_index: usize) {
    if board.column(to_column_id).is_none() {
        debug!("[notaboard.board] move_card: target column {} not found", to_column_id);
        return;
    }
    let Some(source) = board.column_mut(from_column_id) else {
        debug!("[notaboard.board] move_card: source column {} not found", from_column_id);
        return;
    };
    let Some(pos) = source.card_ids.iter().position(|id| id == card_id) else {
        debug!(
            "[notaboard.board] move_card: card {} not in column {}",
            card_id, from_column_id
        );
        return;
    };
    let moved = source.card_ids.remove(pos);

    if let Some(target) = board.column_mut(to_column_id) {
        let index = to_index.min(target.card_ids.len());
        target.card_ids.insert(index, moved);
    }
}

/// Shallow-merge `patch` into an existing card. Unknown card ids are ignored.
pub fn update_card(workspace: &Workspace, project_id: &str, card_id: &str, patch: &CardPatch) -> Workspace {
    with_project(workspace, project_id, |project| {
        match project.board.cards.get_mut(card_id) {
            Some(card) => patch.apply_to(card),
            None => debug!("[notaboard.board] update_card: card {} not found", card_id),
        }
    })
}
