use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::{repo_types::Author, validate};
use crate::{
    error::{AuthorError, BoxError, Result},
    store::{NamedParams, QueryExecutor, Row},
};

const SELECT_COLUMNS: &str = r#"SELECT "authorId", "authorAvatarUrl", "authorActivationToken",
       "authorEmail", "authorHash", "authorUsername"
  FROM author"#;

fn store_error(op: &'static str) -> impl FnOnce(BoxError) -> AuthorError {
    move |e| {
        error!(error = %e, op, "author store failure");
        AuthorError::Store(e)
    }
}

/// Rebuild an author from a stored row. Rows that no longer validate are a
/// store fault.
fn from_row(row: &Row) -> std::result::Result<Author, BoxError> {
    let id = Uuid::from_slice(row.bytes("authorId")?)?;
    let author = Author::new(
        id,
        row.text("authorAvatarUrl")?,
        row.optional_text("authorActivationToken")?,
        row.text("authorEmail")?,
        row.text("authorHash")?,
        row.text("authorUsername")?,
    )?;
    Ok(author)
}

/// Build a LIKE prefilter for an already lowercased search term.
///
/// Store-side `LOWER` may fold ASCII only, so each run of non-ASCII
/// characters becomes a `%` wildcard and the ASCII runs are escaped. Rows
/// whose Unicode-lowercased username contains the term still match, except
/// where a non-ASCII character lowercases into ASCII (e.g. U+212A KELVIN
/// SIGN). The exact match is applied afterwards in Rust.
fn like_prefilter(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    let mut wild = true;
    for c in term.chars() {
        if c.is_ascii() {
            if matches!(c, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(c);
            wild = false;
        } else if !wild {
            out.push('%');
            wild = true;
        }
    }
    if !wild {
        out.push('%');
    }
    out
}

impl Author {
    fn params(&self) -> NamedParams {
        NamedParams::new()
            .with("authorId", self.author_id().as_bytes().to_vec())
            .with("authorAvatarUrl", self.author_avatar_url())
            .with("authorActivationToken", self.author_activation_token())
            .with("authorEmail", self.author_email())
            .with("authorHash", self.author_hash())
            .with("authorUsername", self.author_username())
    }

    /// Insert this author as a new row.
    #[instrument(skip(self, db), fields(author_id = %self.author_id()))]
    pub async fn insert<E>(&self, db: &E) -> Result<()>
    where
        E: QueryExecutor + ?Sized,
    {
        db.execute(
            r#"INSERT INTO author("authorId", "authorAvatarUrl", "authorActivationToken",
                   "authorEmail", "authorHash", "authorUsername")
               VALUES(:authorId, :authorAvatarUrl, :authorActivationToken,
                   :authorEmail, :authorHash, :authorUsername)"#,
            &self.params(),
        )
        .await
        .map_err(store_error("insert"))?;
        debug!("author inserted");
        Ok(())
    }

    /// Rewrite every non-key column of this author's row.
    ///
    /// Returns the affected-row count; zero means no row has this id.
    #[instrument(skip(self, db), fields(author_id = %self.author_id()))]
    pub async fn update<E>(&self, db: &E) -> Result<u64>
    where
        E: QueryExecutor + ?Sized,
    {
        let affected = db
            .execute(
                r#"UPDATE author
                      SET "authorAvatarUrl" = :authorAvatarUrl,
                          "authorActivationToken" = :authorActivationToken,
                          "authorEmail" = :authorEmail,
                          "authorHash" = :authorHash,
                          "authorUsername" = :authorUsername
                    WHERE "authorId" = :authorId"#,
                &self.params(),
            )
            .await
            .map_err(store_error("update"))?;
        if affected == 0 {
            warn!("update matched no author row");
        }
        Ok(affected)
    }

    /// Delete this author's row. Returns the affected-row count.
    #[instrument(skip(self, db), fields(author_id = %self.author_id()))]
    pub async fn delete<E>(&self, db: &E) -> Result<u64>
    where
        E: QueryExecutor + ?Sized,
    {
        let params = NamedParams::new().with("authorId", self.author_id().as_bytes().to_vec());
        let affected = db
            .execute(r#"DELETE FROM author WHERE "authorId" = :authorId"#, &params)
            .await
            .map_err(store_error("delete"))?;
        debug!(affected, "author deleted");
        Ok(affected)
    }

    /// Find an author by id.
    #[instrument(skip(db))]
    pub async fn find_by_id<E>(db: &E, author_id: Uuid) -> Result<Option<Author>>
    where
        E: QueryExecutor + ?Sized,
    {
        let params = NamedParams::new().with("authorId", author_id.as_bytes().to_vec());
        let sql = format!(r#"{SELECT_COLUMNS} WHERE "authorId" = :authorId"#);
        let rows = db
            .fetch_all(&sql, &params)
            .await
            .map_err(store_error("find_by_id"))?;
        rows.first()
            .map(from_row)
            .transpose()
            .map_err(store_error("find_by_id"))
    }

    /// Find authors whose username contains `username`, ignoring case.
    ///
    /// The term is sanitized like a username; an empty result is not an
    /// error.
    #[instrument(skip(db))]
    pub async fn find_by_username<E>(db: &E, username: &str) -> Result<Vec<Author>>
    where
        E: QueryExecutor + ?Sized,
    {
        let needle = validate::username_search(username)?.to_lowercase();
        let params = NamedParams::new().with("authorUsername", like_prefilter(&needle));
        let sql = format!(
            r#"{SELECT_COLUMNS}
 WHERE LOWER("authorUsername") LIKE :authorUsername ESCAPE '\'
 ORDER BY "authorUsername", "authorId""#
        );
        let rows = db
            .fetch_all(&sql, &params)
            .await
            .map_err(store_error("find_by_username"))?;
        let authors = rows
            .iter()
            .map(from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_error("find_by_username"))?
            .into_iter()
            .filter(|a| a.author_username().to_lowercase().contains(&needle))
            .collect::<Vec<_>>();
        debug!(count = authors.len(), "authors found by username");
        Ok(authors)
    }
}
