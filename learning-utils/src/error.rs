#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidSchedule(String),
    #[error("{0}")]
    Validation(String),
}
