//! Shared helpers for reading row cells as strings.

/// Read a DuckDB cell as text, trying multiple column types.
///
/// DuckDB integer columns return an error for `Option<String>`, so we try
/// String -> i64 -> f64 -> bool. NULL (or anything unreadable) is `None`.
pub(crate) fn duckdb_cell(row: &duckdb::Row<'_>, idx: usize) -> Option<String> {
    if let Ok(value) = row.get::<_, Option<String>>(idx) {
        return value;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return Some(n.to_string());
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return Some(f.to_string());
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return Some(b.to_string());
    }
    None
}

/// Read a SQLite cell as text, trying multiple storage classes.
pub(crate) fn sqlite_cell(row: &rusqlite::Row<'_>, idx: usize) -> Option<String> {
    if let Ok(value) = row.get::<_, Option<String>>(idx) {
        return value;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return Some(n.to_string());
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return Some(f.to_string());
    }
    None
}
