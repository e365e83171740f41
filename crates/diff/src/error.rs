use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),
}
