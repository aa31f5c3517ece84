/// An error type for the geometry operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Pcreg3dError {
    /// Error when source and destination buffers disagree in length.
    #[error("source has {0} points but destination has {1}")]
    LengthMismatch(usize, usize),

    /// Error when a pose vector does not carry exactly six parameters.
    #[error("pose vector must have 6 elements, got {0}")]
    InvalidPoseDimension(usize),
}
