//! Conjunctive path queries over indexed entries
//!
//! A query is a list of filters and a list of projected fields. Each filter
//! selects the set of files having at least one matching entry; a file is
//! part of the result only if every filter selects it. Rows are projected
//! from the entries matching the last filter.

use std::fmt;

use rusqlite::types::Value as SqlValue;

use super::errors::{IndexError, IndexResult};

/// Separator between path segments in `full_path` and `parent_path`
pub const PATH_SEPARATOR: &str = ".";

/// What a filter matches at its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueFilter {
    /// Entries whose parent is the path (lists keys at that position)
    Children,
    /// The entry at the path itself
    Present,
    /// Leaf at the path with this string value
    Equals(String),
}

/// One conjunct of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    /// Key path from the document root
    pub path: Vec<String>,
    /// Match kind
    pub value: ValueFilter,
}

impl Filter {
    /// Entries directly below `path`
    pub fn children<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(path, ValueFilter::Children)
    }

    /// The entry at `path`
    pub fn present<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(path, ValueFilter::Present)
    }

    /// The leaf at `path` with value `value`
    pub fn equals<I, S>(path: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(path, ValueFilter::Equals(value.into()))
    }

    fn new<I, S>(path: I, value: ValueFilter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            value,
        }
    }

    /// Dot-joined path
    pub fn full_path(&self) -> String {
        self.path.join(PATH_SEPARATOR)
    }

    /// SQL condition over `entries` and its parameters
    pub(crate) fn condition(&self, alias: &str) -> IndexResult<(String, Vec<SqlValue>)> {
        let full_path = self.full_path();
        match &self.value {
            ValueFilter::Children if self.path.is_empty() => {
                Ok((format!("{alias}.parent_path IS NULL"), Vec::new()))
            }
            ValueFilter::Children => Ok((
                format!("{alias}.parent_path = ?"),
                vec![SqlValue::Text(full_path)],
            )),
            _ if self.path.is_empty() => Err(IndexError::invalid_query(
                "only a children filter can address the document root",
            )),
            ValueFilter::Present => Ok((
                format!("{alias}.full_path = ?"),
                vec![SqlValue::Text(full_path)],
            )),
            ValueFilter::Equals(value) => Ok((
                format!("{alias}.full_path = ? AND {alias}.is_leaf = 1 AND {alias}.value = ?"),
                vec![SqlValue::Text(full_path), SqlValue::Text(value.clone())],
            )),
        }
    }
}

/// Projectable entry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Path of the indexed file
    Path,
    /// Last path segment
    Key,
    /// String form of a leaf value, null for branches
    Value,
    /// Dot-joined key path
    FullPath,
    /// Whether the entry is a leaf
    IsLeaf,
}

impl Field {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Field::Path => "f.path",
            Field::Key => "e.last_segment",
            Field::Value => "e.value",
            Field::FullPath => "e.full_path",
            Field::IsLeaf => "e.is_leaf",
        }
    }
}

/// One projected cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    /// SQL NULL, the value of a branch
    Null,
    /// Path, key or leaf text
    Text(String),
    /// Leaf flag
    Bool(bool),
}

impl CellValue {
    /// Text content, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A projected result row, cells in requested field order
pub type Row = Vec<CellValue>;

/// Builds the SQL statement for a query.
pub(crate) fn build_sql(fields: &[Field], filters: &[Filter]) -> IndexResult<(String, Vec<SqlValue>)> {
    if fields.is_empty() {
        return Err(IndexError::invalid_query("no fields requested"));
    }
    let last = filters
        .last()
        .ok_or_else(|| IndexError::invalid_query("no filters given"))?;

    let mut params = Vec::new();
    let mut selects = Vec::with_capacity(filters.len());
    for filter in filters {
        let (condition, values) = filter.condition("s")?;
        selects.push(format!("SELECT s.file_id FROM entries s WHERE {}", condition));
        params.extend(values);
    }

    let (projection_condition, values) = last.condition("e")?;
    params.extend(values);

    let columns: Vec<&str> = fields.iter().map(Field::column).collect();
    let columns = columns.join(", ");
    let sql = format!(
        "SELECT DISTINCT {columns} FROM entries e JOIN files f ON f.id = e.file_id \
         WHERE e.file_id IN ({files}) AND {projection_condition} \
         ORDER BY {columns}",
        files = selects.join(" INTERSECT "),
    );
    Ok((sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path_joins_with_dots() {
        assert_eq!(Filter::present(["x", "y"]).full_path(), "x.y");
        assert_eq!(Filter::children(Vec::<String>::new()).full_path(), "");
    }

    #[test]
    fn test_root_children_condition() {
        let (sql, params) = Filter::children(Vec::<String>::new()).condition("e").unwrap();
        assert_eq!(sql, "e.parent_path IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_root_equals_rejected() {
        let err = Filter::equals(Vec::<String>::new(), "1").condition("e").unwrap_err();
        assert_eq!(err.code().code(), "HODS_INDEX_INVALID_QUERY");
    }

    #[test]
    fn test_sql_has_one_select_per_filter() {
        let (sql, params) = build_sql(
            &[Field::Path],
            &[Filter::equals(["x", "y"], "1"), Filter::equals(["x", "y"], "2")],
        )
        .unwrap();
        assert_eq!(sql.matches(" INTERSECT ").count(), 1);
        // two per filter, plus two for the projection condition
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_empty_fields_or_filters_rejected() {
        assert!(build_sql(&[], &[Filter::present(["x"])]).is_err());
        assert!(build_sql(&[Field::Key], &[]).is_err());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Text("a".into()).to_string(), "a");
        assert_eq!(CellValue::Bool(true).to_string(), "true");
    }
}
