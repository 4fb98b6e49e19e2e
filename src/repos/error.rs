/*
 * Responsibility
 * - Meaning of data-layer failures as seen by the layers above
 */
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    /// The store refused the write (unique title, length, not-null ...).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Connection, pool, timeout or decoding failure. `reason` is for logs only.
    #[error("data store unavailable")]
    Unavailable { reason: String },
}

impl RepoError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Class 22 (data exception) and 23 (integrity constraint violation)
    /// SQLSTATEs are the caller's fault; everything else is the store's.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && let Some(code) = dbe.code()
            && (code.starts_with("23") || code.starts_with("22"))
        {
            return RepoError::Constraint(dbe.message().to_string());
        }
        RepoError::unavailable(e.to_string())
    }
}
