/// An error type for the correspondence search and registration operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum IcpError {
    /// Error when the inlier ratio falls outside `(0, 1]`.
    #[error("inlier ratio must be in (0, 1], got {0}")]
    InvalidInlierRatio(f64),

    /// Error when searching a tree that holds no points.
    #[error("cannot search an empty tree")]
    EmptyTree,

    /// Error when the query point cloud is empty.
    #[error("query point cloud is empty")]
    EmptyTargets,

    /// Error when two clouds that must be parallel disagree in size.
    #[error("cloud size mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The size required by the paired input.
        expected: usize,
        /// The size actually supplied.
        actual: usize,
    },

    /// Error bubbled up from the geometry crate.
    #[error(transparent)]
    Geometry(#[from] pcreg_3d::Pcreg3dError),
}
