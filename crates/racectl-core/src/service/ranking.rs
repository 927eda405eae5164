//! Position ranking
//!
//! Position is always a pure function of the current finish-time set: after
//! any result write the full set is re-sorted and every position reassigned.
//! Any finish time can be corrected after the fact, including to a value
//! earlier than already-ranked finishes, so incremental patching is never
//! attempted.

#![allow(clippy::cast_possible_wrap)] // positions are indices + 1, far below i64::MAX

/// Sort `rows` ascending by finish time and assign positions 1..=N.
///
/// `rows` must arrive in insertion order; the sort is stable, so equal
/// finish times keep that order. Identifiers never participate in the
/// ordering, since they are not comparable across identity spaces.
pub fn assign_positions<T>(
    rows: &mut [T],
    finish_time: impl Fn(&T) -> i64,
    mut set_position: impl FnMut(&mut T, i64),
) {
    rows.sort_by_key(|row| finish_time(row));
    for (index, row) in rows.iter_mut().enumerate() {
        set_position(row, index as i64 + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        label: &'static str,
        finish_time: i64,
        position: Option<i64>,
    }

    fn row(label: &'static str, finish_time: i64) -> Row {
        Row {
            label,
            finish_time,
            position: None,
        }
    }

    fn rank(rows: &mut [Row]) {
        assign_positions(rows, |r| r.finish_time, |r, p| r.position = Some(p));
    }

    #[test]
    fn test_positions_follow_finish_time_not_recording_order() {
        // X recorded first at 1125, Y second at 1080
        let mut rows = vec![row("x", 1_125), row("y", 1_080)];
        rank(&mut rows);

        assert_eq!(rows[0].label, "y");
        assert_eq!(rows[0].position, Some(1));
        assert_eq!(rows[1].label, "x");
        assert_eq!(rows[1].position, Some(2));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut rows = vec![row("first", 500), row("second", 500), row("third", 400)];
        rank(&mut rows);

        let order: Vec<_> = rows.iter().map(|r| r.label).collect();
        assert_eq!(order, vec!["third", "first", "second"]);
        let positions: Vec<_> = rows.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_rerank_is_idempotent() {
        let mut rows = vec![row("a", 300), row("b", 100), row("c", 200)];
        rank(&mut rows);
        let once = rows.clone();
        rank(&mut rows);
        assert_eq!(rows, once);
    }

    #[test]
    fn test_positions_are_a_permutation() {
        let mut rows = vec![
            row("a", 90),
            row("b", 10),
            row("c", 50),
            row("d", 10),
            row("e", 70),
        ];
        rank(&mut rows);

        let mut positions: Vec<_> = rows.iter().filter_map(|r| r.position).collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_correction_to_earlier_time_reorders() {
        let mut rows = vec![row("a", 100), row("b", 200)];
        rank(&mut rows);
        assert_eq!(rows[0].label, "a");

        // Correct b's time to before a's
        for r in rows.iter_mut() {
            if r.label == "b" {
                r.finish_time = 50;
            }
        }
        // Restore insertion order before the rerank, as the store read does
        rows.sort_by_key(|r| if r.label == "a" { 0 } else { 1 });
        rank(&mut rows);

        assert_eq!(rows[0].label, "b");
        assert_eq!(rows[0].position, Some(1));
        assert_eq!(rows[1].position, Some(2));
    }

    #[test]
    fn test_empty_set_is_a_no_op() {
        let mut rows: Vec<Row> = Vec::new();
        rank(&mut rows);
        assert!(rows.is_empty());
    }
}
