//! Relational-query executor seam.
//!
//! Statements are written with named `:name` placeholders and executed through
//! a [`QueryExecutor`]. Reads come back as ordered column-name to value rows.

use async_trait::async_trait;

use crate::error::BoxError;

pub mod postgres;
pub mod sqlite;

/// A single bound parameter or column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Bytes(Vec<u8>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Named statement parameters, in binding order.
#[derive(Debug, Clone, Default)]
pub struct NamedParams {
    values: Vec<(&'static str, SqlValue)>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<SqlValue>) -> Self {
        self.values.push((name, value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Rewrite `:name` placeholders into positional `$n` ones.
    ///
    /// Returns the rewritten statement and the values in positional order. A
    /// name used twice maps to the same position. `::` casts and quoted
    /// literals are left untouched.
    pub fn to_positional<'a>(&'a self, sql: &str) -> Result<(String, Vec<&'a SqlValue>), BoxError> {
        let mut out = String::with_capacity(sql.len());
        let mut order: Vec<&str> = Vec::new();
        let mut chars = sql.char_indices().peekable();
        let mut in_literal = false;

        while let Some((i, c)) = chars.next() {
            if in_literal {
                out.push(c);
                if c == '\'' {
                    in_literal = false;
                }
                continue;
            }
            match c {
                '\'' => {
                    in_literal = true;
                    out.push(c);
                }
                ':' if matches!(chars.peek(), Some((_, ':'))) => {
                    chars.next();
                    out.push_str("::");
                }
                ':' if chars
                    .peek()
                    .is_some_and(|(_, n)| n.is_ascii_alphabetic() || *n == '_') =>
                {
                    let start = i + 1;
                    let mut end = start;
                    while let Some(&(j, n)) = chars.peek() {
                        if !(n.is_ascii_alphanumeric() || n == '_') {
                            break;
                        }
                        end = j + n.len_utf8();
                        chars.next();
                    }
                    let name = &sql[start..end];
                    let position = match order.iter().position(|n| *n == name) {
                        Some(p) => p,
                        None => {
                            order.push(name);
                            order.len() - 1
                        }
                    };
                    out.push('$');
                    out.push_str(&(position + 1).to_string());
                }
                _ => out.push(c),
            }
        }

        let values = order
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| BoxError::from(format!("no value bound for parameter :{name}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((out, values))
    }
}

/// One result row: column names mapped to values, in select order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            columns: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: SqlValue) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn column(&self, name: &str) -> Result<&SqlValue, BoxError> {
        self.get(name)
            .ok_or_else(|| BoxError::from(format!("column {name} missing from row")))
    }

    pub fn text(&self, name: &str) -> Result<&str, BoxError> {
        match self.column(name)? {
            SqlValue::Text(s) => Ok(s),
            other => Err(format!("column {name}: expected text, got {other:?}").into()),
        }
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, BoxError> {
        match self.column(name)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s)),
            other => Err(format!("column {name}: expected text, got {other:?}").into()),
        }
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8], BoxError> {
        match self.column(name)? {
            SqlValue::Bytes(b) => Ok(b),
            other => Err(format!("column {name}: expected bytes, got {other:?}").into()),
        }
    }
}

/// Executes parameterized statements against a relational store.
///
/// Implementations own connection handling; callers pass an already
/// initialized executor into each operation.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a write statement and return the affected-row count.
    async fn execute(&self, sql: &str, params: &NamedParams) -> Result<u64, BoxError>;
    /// Run a read statement and return every row.
    async fn fetch_all(&self, sql: &str, params: &NamedParams) -> Result<Vec<Row>, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_named_placeholders_in_first_use_order() {
        let params = NamedParams::new()
            .with("b", "two")
            .with("a", "one");
        let (sql, values) = params
            .to_positional("SELECT * FROM t WHERE x = :a AND y = :b OR z = :a")
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE x = $1 AND y = $2 OR z = $1");
        assert_eq!(
            values,
            vec![&SqlValue::Text("one".into()), &SqlValue::Text("two".into())]
        );
    }

    #[test]
    fn leaves_casts_and_literals_alone() {
        let params = NamedParams::new().with("id", vec![1u8, 2]);
        let (sql, values) = params
            .to_positional("SELECT ':nope', x::text FROM t WHERE id = :id")
            .unwrap();
        assert_eq!(sql, "SELECT ':nope', x::text FROM t WHERE id = $1");
        assert_eq!(values, vec![&SqlValue::Bytes(vec![1, 2])]);
    }

    #[test]
    fn unbound_parameter_is_an_error() {
        let err = NamedParams::new()
            .to_positional("DELETE FROM t WHERE id = :id")
            .unwrap_err();
        assert!(err.to_string().contains(":id"));
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("abc".to_string())),
            SqlValue::Text("abc".into())
        );
    }

    #[test]
    fn row_accessors_check_types() {
        let mut row = Row::with_capacity(3);
        row.push("id", SqlValue::Bytes(vec![7]));
        row.push("name", SqlValue::Text("anna".into()));
        row.push("token", SqlValue::Null);

        assert_eq!(row.bytes("id").unwrap(), &[7]);
        assert_eq!(row.text("name").unwrap(), "anna");
        assert_eq!(row.optional_text("token").unwrap(), None);
        assert!(row.text("id").is_err());
        assert!(row.text("missing").is_err());
        let names: Vec<_> = row.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["id", "name", "token"]);
    }
}
