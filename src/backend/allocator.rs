//! Id allocation for file-backed tables. Relational tables take ids from their primary key sequence.

use crate::row::{row_id, set_row_id, Row, RowId};

/// Next free id: one past the highest id present, starting at 1. `None` once `i64::MAX` is taken.
pub fn next_id(rows: &[Row]) -> Option<RowId> {
    rows.iter().filter_map(row_id).max().unwrap_or(0).checked_add(1)
}

/// Reassign ids `1..=N` in current row order. Applied after any batch that deleted rows.
pub fn renumber(rows: &mut [Row]) {
    for (i, row) in rows.iter_mut().enumerate() {
        set_row_id(row, i as RowId + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(ids: &[i64]) -> Vec<Row> {
        ids.iter()
            .map(|id| json!({ "id": id, "tag": format!("r{}", id) }).as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn next_id_starts_at_one() {
        assert_eq!(next_id(&[]), Some(1));
    }

    #[test]
    fn next_id_is_past_the_max() {
        assert_eq!(next_id(&rows(&[1, 7, 3])), Some(8));
    }

    #[test]
    fn next_id_stops_at_max() {
        assert_eq!(next_id(&rows(&[RowId::MAX])), None);
    }

    #[test]
    fn renumber_keeps_order() {
        let mut r = rows(&[2, 5, 9]);
        renumber(&mut r);
        let ids: Vec<_> = r.iter().filter_map(row_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(r[0]["tag"], json!("r2"));
        assert_eq!(r[2]["tag"], json!("r9"));
    }
}
