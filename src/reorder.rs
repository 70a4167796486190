// src/reorder.rs
//! Ordered-list move primitive shared by condition chains and action lists
//!
//! A move takes the element at `from` out of the sequence and inserts it at
//! `to`, so everything between the two positions shifts by one slot and
//! every other element keeps its relative order.

/// Items that can be addressed by id during drag-and-drop
pub trait Identified {
    fn id(&self) -> &str;
}

/// Move the element at `from` to position `to` in place.
///
/// Returns `false` and leaves `items` untouched when `from == to` or either
/// index is out of bounds.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || from >= items.len() || to >= items.len() {
        return false;
    }

    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// Value-returning form of [`move_item`]
pub fn reordered<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    move_item(&mut out, from, to);
    out
}

/// Drag-end adapter: move `active_id` onto the slot currently held by `over_id`.
///
/// Dropping outside any target (`over_id == None`), onto itself, or with an
/// unknown id is a no-op.
pub fn move_by_id<T: Identified>(items: &mut Vec<T>, active_id: &str, over_id: Option<&str>) -> bool {
    let over_id = match over_id {
        Some(id) if id != active_id => id,
        _ => return false,
    };

    let from = items.iter().position(|item| item.id() == active_id);
    let to = items.iter().position(|item| item.id() == over_id);

    match (from, to) {
        (Some(from), Some(to)) => move_item(items, from, to),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str);

    impl Identified for Item {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_move_forward() {
        assert_eq!(reordered(&["A", "B", "C"], 0, 2), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_move_backward() {
        assert_eq!(reordered(&["A", "B", "C", "D"], 3, 1), vec!["A", "D", "B", "C"]);
    }

    #[test]
    fn test_identity_and_out_of_bounds() {
        let mut items = vec!["A", "B", "C"];
        assert!(!move_item(&mut items, 1, 1));
        assert!(!move_item(&mut items, 0, 3));
        assert!(!move_item(&mut items, 5, 0));
        assert_eq!(items, vec!["A", "B", "C"]);

        let mut empty: Vec<&str> = Vec::new();
        assert!(!move_item(&mut empty, 0, 0));
    }

    #[test]
    fn test_move_by_id() {
        let mut items = vec![Item("a"), Item("b"), Item("c")];
        assert!(move_by_id(&mut items, "c", Some("a")));
        assert_eq!(items, vec![Item("c"), Item("a"), Item("b")]);
    }

    #[test]
    fn test_move_by_id_guards() {
        let mut items = vec![Item("a"), Item("b")];
        assert!(!move_by_id(&mut items, "a", None));
        assert!(!move_by_id(&mut items, "a", Some("a")));
        assert!(!move_by_id(&mut items, "a", Some("zzz")));
        assert!(!move_by_id(&mut items, "zzz", Some("a")));
        assert_eq!(items, vec![Item("a"), Item("b")]);
    }
}
