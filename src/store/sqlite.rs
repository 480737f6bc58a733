use async_trait::async_trait;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef,
};

use super::{NamedParams, QueryExecutor, Row, SqlValue};
use crate::error::BoxError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS author (
    "authorId"              BLOB         NOT NULL PRIMARY KEY CHECK (length("authorId") = 16),
    "authorAvatarUrl"       VARCHAR(255) NOT NULL,
    "authorActivationToken" VARCHAR(32),
    "authorEmail"           VARCHAR(128) NOT NULL UNIQUE,
    "authorHash"            CHAR(97)     NOT NULL,
    "authorUsername"        VARCHAR(32)  NOT NULL UNIQUE
)
"#;

/// Create the `author` table on a SQLite database if it is missing.
pub async fn create_schema(db: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(db).await?;
    Ok(())
}

fn bind<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<&SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.len());
    for column in row.columns() {
        let i = column.ordinal();
        let value = if row.try_get_raw(i)?.is_null() {
            SqlValue::Null
        } else if column.type_info().name() == "BLOB" {
            SqlValue::Bytes(row.try_get(i)?)
        } else {
            SqlValue::Text(row.try_get(i)?)
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl QueryExecutor for SqlitePool {
    async fn execute(&self, sql: &str, params: &NamedParams) -> Result<u64, BoxError> {
        let (sql, values) = params.to_positional(sql)?;
        let done = bind(sqlx::query(&sql), values).execute(self).await?;
        Ok(done.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &NamedParams) -> Result<Vec<Row>, BoxError> {
        let (sql, values) = params.to_positional(sql)?;
        let rows = bind(sqlx::query(&sql), values).fetch_all(self).await?;
        let rows = rows.iter().map(decode).collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn pool() -> SqlitePool {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        create_schema(&db).await.expect("schema");
        db
    }

    #[tokio::test]
    async fn execute_and_fetch_with_named_params() {
        let db = pool().await;
        let params = NamedParams::new()
            .with("id", vec![0u8; 16])
            .with("url", "https://a.example/x.png")
            .with("token", None::<String>)
            .with("email", "a@b.com")
            .with("hash", "h")
            .with("name", "anna");
        let affected = db
            .execute(
                r#"INSERT INTO author("authorId", "authorAvatarUrl", "authorActivationToken",
                       "authorEmail", "authorHash", "authorUsername")
                   VALUES(:id, :url, :token, :email, :hash, :name)"#,
                &params,
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = db
            .fetch_all(
                r#"SELECT "authorId", "authorUsername", "authorActivationToken" FROM author WHERE "authorUsername" = :name"#,
                &NamedParams::new().with("name", "anna"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.bytes("authorId").unwrap(), &[0u8; 16]);
        assert_eq!(row.text("authorUsername").unwrap(), "anna");
        assert_eq!(row.get("authorActivationToken"), Some(&SqlValue::Null));
    }

    #[tokio::test]
    async fn constraint_violation_surfaces_as_error() {
        let db = pool().await;
        let sql = r#"INSERT INTO author("authorId", "authorAvatarUrl", "authorEmail", "authorHash", "authorUsername")
                     VALUES(:id, 'u', 'e@x.io', 'h', 'n')"#;
        db.execute(sql, &NamedParams::new().with("id", vec![1u8; 16]))
            .await
            .unwrap();
        let err = db
            .execute(sql, &NamedParams::new().with("id", vec![2u8; 16]))
            .await;
        assert!(err.is_err());
    }
}
