//! Sanitize-and-validate helpers for each author field.
//!
//! Every function trims its input, normalizes it for the field's semantic
//! type and returns the value to store, or the reason it was rejected.

use argon2::password_hash::PasswordHash;
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AuthorError, Result};

pub const AVATAR_URL_MAX: usize = 255;
pub const ACTIVATION_TOKEN_MAX: usize = 32;
pub const EMAIL_MAX: usize = 128;
pub const HASH_LEN: usize = 97;
pub const USERNAME_MAX: usize = 32;

const URL_SPECIALS: &str = "$-_.+!*'(),{}|\\^~[]`<>#%\";/?:@&=";
const EMAIL_SPECIALS: &str = "!#$%&'*+-=?^_`{|}~@.[]";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Keep only the characters allowed in a URL.
pub fn sanitize_url(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || URL_SPECIALS.contains(*c))
        .collect()
}

/// Keep only the characters allowed in an email address.
pub fn sanitize_email(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || EMAIL_SPECIALS.contains(*c))
        .collect()
}

/// Strip markup tags, control characters and stray angle brackets.
pub fn sanitize_string(input: &str) -> String {
    let stripped = TAG_RE.replace_all(input.trim(), "");
    stripped
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn ensure_max(value: &str, max: usize, field: &str) -> Result<()> {
    if value.chars().count() > max {
        return Err(AuthorError::out_of_range(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Parse a textual author id.
pub fn parse_author_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim())
        .map_err(|e| AuthorError::invalid(format!("author id is not a valid uuid: {e}")))
}

pub fn avatar_url(input: &str) -> Result<String> {
    let url = sanitize_url(input);
    if url.is_empty() {
        return Err(AuthorError::invalid("avatar url is empty or insecure"));
    }
    ensure_max(&url, AVATAR_URL_MAX, "avatar url")?;
    Ok(url)
}

/// Validate an optional activation token. Tokens are stored lowercase.
pub fn activation_token(input: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = input else {
        return Ok(None);
    };
    let token = raw.trim().to_ascii_lowercase();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AuthorError::invalid("activation token is not hexadecimal"));
    }
    ensure_max(&token, ACTIVATION_TOKEN_MAX, "activation token")?;
    Ok(Some(token))
}

pub fn email(input: &str) -> Result<String> {
    let email = sanitize_email(input);
    if email.is_empty() {
        return Err(AuthorError::invalid("email is empty or insecure"));
    }
    ensure_max(&email, EMAIL_MAX, "email")?;
    if !is_valid_email(&email) {
        return Err(AuthorError::invalid("email is not a valid address"));
    }
    Ok(email)
}

/// Check that `input` is an already computed Argon2i PHC string.
pub fn hash(input: &str) -> Result<String> {
    let hash = input.trim();
    if hash.is_empty() {
        return Err(AuthorError::invalid("password hash is empty or insecure"));
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        debug!(error = %e, "argon2 parse hash error");
        AuthorError::invalid("password hash is not a valid hash")
    })?;
    if parsed.algorithm.as_str() != "argon2i" {
        return Err(AuthorError::invalid(format!(
            "password hash uses {}, expected argon2i",
            parsed.algorithm
        )));
    }
    if hash.chars().count() != HASH_LEN {
        return Err(AuthorError::out_of_range(format!(
            "password hash must be exactly {HASH_LEN} characters"
        )));
    }
    Ok(hash.to_string())
}

pub fn username(input: &str) -> Result<String> {
    let username = username_search(input)?;
    ensure_max(&username, USERNAME_MAX, "username")?;
    Ok(username)
}

/// Sanitize a username search term. Only emptiness is checked.
pub fn username_search(input: &str) -> Result<String> {
    let username = sanitize_string(input);
    if username.is_empty() {
        return Err(AuthorError::invalid("username is empty or insecure"));
    }
    Ok(username)
}

/// Fresh 32-character lowercase hex activation token.
pub fn generate_activation_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
