use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::Query,
    Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef,
};

use super::{NamedParams, QueryExecutor, Row, SqlValue};
use crate::error::BoxError;

fn bind<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: Vec<&SqlValue>,
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.len());
    for column in row.columns() {
        let i = column.ordinal();
        let value = if row.try_get_raw(i)?.is_null() {
            SqlValue::Null
        } else if column.type_info().name() == "BYTEA" {
            SqlValue::Bytes(row.try_get(i)?)
        } else {
            SqlValue::Text(row.try_get(i)?)
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl QueryExecutor for PgPool {
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
    use uuid::Uuid;

    use super::*;
    use crate::{author::validate::tests::HASH_A, db, Author};

    #[tokio::test]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn decodes_bytea_char_and_null_columns() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = PgPool::connect(&url).await.expect("connect");
        db::migrate(&pool).await.expect("migrate");

        let id = Uuid::new_v4();
        let tag = id.simple().to_string()[..12].to_string();
        let author = Author::new(
            id,
            "https://img.example/pg.png",
            None,
            &format!("pg-{tag}@example.com"),
            HASH_A,
            &format!("Pg{tag}"),
        )
        .unwrap();
        author.insert(&pool).await.unwrap();

        let rows = pool
            .fetch_all(
                r#"SELECT "authorId", "authorHash", "authorActivationToken" FROM author WHERE "authorId" = :id"#,
                &NamedParams::new().with("id", id.as_bytes().to_vec()),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bytes("authorId").unwrap(), id.as_bytes());
        assert_eq!(rows[0].text("authorHash").unwrap(), HASH_A);
        assert_eq!(rows[0].get("authorActivationToken"), Some(&SqlValue::Null));

        let found = Author::find_by_id(&pool, id).await.unwrap();
        assert_eq!(found, Some(author.clone()));
        assert_eq!(author.delete(&pool).await.unwrap(), 1);
    }
}
