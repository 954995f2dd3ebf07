#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("Zoom {context} error {status}: {body}")]
    Vendor {
        context: &'static str,
        status: u16,
        body: String,
    },
    #[error("{0}")]
    Signature(String),
    // Froms
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}
