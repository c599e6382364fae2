//! List and selection rules shared by every list-backed slice.

use crate::models::Entity;

/// Removes `deleted_id` from `items`. If it was the selection, the first
/// remaining item becomes selected (or nothing, when the list is empty).
pub fn remove_and_reselect<T: Entity>(
    items: Vec<T>,
    selected: Option<T>,
    deleted_id: &str,
) -> (Vec<T>, Option<T>) {
    let items: Vec<T> = items.into_iter().filter(|i| i.id() != deleted_id).collect();
    let selected = match selected {
        Some(s) if s.id() == deleted_id => items.first().cloned(),
        other => other,
    };
    (items, selected)
}

/// Swaps the item with the same id for `updated`, keeping its position.
/// Returns false when no item matched.
pub fn replace_in_place<T: Entity>(items: &mut [T], updated: &T) -> bool {
    match items.iter_mut().find(|i| i.id() == updated.id()) {
        Some(slot) => {
            *slot = updated.clone();
            true
        }
        None => false,
    }
}
