use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Empty input, mismatched image dimensions or mismatched landmark counts.
    #[error("input shape error: {0}")]
    InputShape(String),

    /// Landmark recognition was requested but no classifier was trained for
    /// this gallery.
    #[error("no landmark classifier was trained for this gallery")]
    UntrainedModel,

    /// The classifier predicted a shortened class key that no enrolled face
    /// maps to.
    #[error("predicted class key {0} is not present in the enrolled gallery")]
    UnknownIdentity(i32),

    #[error("invalid model data: {0}")]
    InvalidModel(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
