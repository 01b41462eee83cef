use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A row with this unique name already exists.
    #[error("name already exists: {0}")]
    DuplicateName(String),

    #[error("failed to hash or verify password: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl Error {
    /// Maps a unique-constraint violation onto [`Error::DuplicateName`].
    pub(crate) fn from_insert(err: sqlx::Error, name: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::DuplicateName(name.to_string())
            }
            _ => Self::Sqlx(err),
        }
    }

    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, Self::DuplicateName(_))
    }
}
