#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Primary key field {key} of {record} is null")]
    NullPrimaryKey {
        record: &'static str,
        key: &'static str,
    },
}

impl Error {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}
