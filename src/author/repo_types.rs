use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate;
use crate::error::{AuthorError, Result};

/// Author record, one row of the `author` table.
///
/// Every field is validated on construction and on each setter call. The id
/// is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    author_id: Uuid,
    author_avatar_url: String,
    author_activation_token: Option<String>,
    author_email: String,
    #[serde(skip_serializing)]
    author_hash: String, // Argon2i hash, not exposed in JSON
    author_username: String,
}

impl Author {
    /// Build a validated author. The first failing field aborts construction.
    pub fn new(
        author_id: Uuid,
        avatar_url: &str,
        activation_token: Option<&str>,
        email: &str,
        hash: &str,
        username: &str,
    ) -> Result<Self> {
        Ok(Self {
            author_id,
            author_avatar_url: validate::avatar_url(avatar_url)?,
            author_activation_token: validate::activation_token(activation_token)?,
            author_email: validate::email(email)?,
            author_hash: validate::hash(hash)?,
            author_username: validate::username(username)?,
        })
    }

    /// Same as [`Author::new`] with a textual id.
    pub fn parse(
        author_id: &str,
        avatar_url: &str,
        activation_token: Option<&str>,
        email: &str,
        hash: &str,
        username: &str,
    ) -> Result<Self> {
        let author_id = validate::parse_author_id(author_id)?;
        Self::new(author_id, avatar_url, activation_token, email, hash, username)
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn author_avatar_url(&self) -> &str {
        &self.author_avatar_url
    }

    pub fn author_activation_token(&self) -> Option<&str> {
        self.author_activation_token.as_deref()
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }

    pub fn author_hash(&self) -> &str {
        &self.author_hash
    }

    pub fn author_username(&self) -> &str {
        &self.author_username
    }

    pub fn set_author_avatar_url(&mut self, avatar_url: &str) -> Result<()> {
        self.author_avatar_url = validate::avatar_url(avatar_url)?;
        Ok(())
    }

    pub fn set_author_activation_token(&mut self, activation_token: Option<&str>) -> Result<()> {
        self.author_activation_token = validate::activation_token(activation_token)?;
        Ok(())
    }

    pub fn set_author_email(&mut self, email: &str) -> Result<()> {
        self.author_email = validate::email(email)?;
        Ok(())
    }

    pub fn set_author_hash(&mut self, hash: &str) -> Result<()> {
        self.author_hash = validate::hash(hash)?;
        Ok(())
    }

    pub fn set_author_username(&mut self, username: &str) -> Result<()> {
        self.author_username = validate::username(username)?;
        Ok(())
    }
}

/// Unvalidated author payload, e.g. decoded from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthor {
    pub author_id: Uuid,
    pub author_avatar_url: String,
    #[serde(default)]
    pub author_activation_token: Option<String>,
    pub author_email: String,
    pub author_hash: String,
    pub author_username: String,
}

impl TryFrom<NewAuthor> for Author {
    type Error = AuthorError;

    fn try_from(n: NewAuthor) -> Result<Self> {
        Author::new(
            n.author_id,
            &n.author_avatar_url,
            n.author_activation_token.as_deref(),
            &n.author_email,
            &n.author_hash,
            &n.author_username,
        )
    }
}
