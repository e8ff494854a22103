use chrono::{SecondsFormat, Utc};

use crate::error::StoreError;

/// Current time as RFC 3339 UTC with microseconds. Lexicographic order of
/// these strings matches chronological order.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an optional column value.
pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    get(row, idx, table, column)
}

/// Parse a JSON id array column, returning CorruptRow on parse failure.
pub fn parse_id_list(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<Vec<i64>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid JSON: {e}"),
    })
}

/// Parse a string into an enum, returning CorruptRow on failure.
pub fn parse_enum<T: std::str::FromStr>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("unknown variant: {raw}"),
    })
}

/// Parse caller input into an enum, returning a Validation error on `field`.
pub fn parse_input<T>(raw: &str, field: &'static str) -> Result<T, StoreError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|message| StoreError::Validation { field, message })
}

/// Escape LIKE special characters; pair with `ESCAPE '\'`.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::TodoStatus;

    #[test]
    fn escape_like_special_chars() {
        assert_eq!(escape_like("hello"), "hello");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("foo_bar"), "foo\\_bar");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn parse_enum_success() {
        let status: TodoStatus = parse_enum("in_progress", "todos", "status").unwrap();
        assert_eq!(status, TodoStatus::InProgress);
    }

    #[test]
    fn parse_enum_failure() {
        let result: Result<TodoStatus, _> = parse_enum("INVALID", "todos", "status");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "todos", column: "status", .. })
        ));
    }

    #[test]
    fn parse_input_names_field() {
        let err = parse_input::<TodoStatus>("later", "status").unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "status", .. }));
        assert!(err.to_string().contains("later"));
    }

    #[test]
    fn parse_id_list_roundtrip() {
        assert_eq!(parse_id_list("[3,1,2]", "awakenings", "loaded_todos").unwrap(), vec![3, 1, 2]);
        assert!(matches!(
            parse_id_list("nope", "awakenings", "loaded_todos"),
            Err(StoreError::CorruptRow { column: "loaded_todos", .. })
        ));
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let a = now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now();
        assert!(a < b);
        assert!(a.ends_with('Z'));
        // 2026-01-01T00:00:00.000000Z
        assert_eq!(a.len(), 27);
    }
}
