#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("{failed} of {total} document(s) could not be processed")]
    FailedDocuments { failed: usize, total: usize },

    #[error("Cannot derive an output file name from {0}")]
    OutputName(String),
}
