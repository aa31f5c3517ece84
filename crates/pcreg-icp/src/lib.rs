#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod bingham;
pub use bingham::{bingham_kf, BinghamState, BinghamUpdate};

mod eigen;

mod error;
pub use error::IcpError;

mod kdtree;
pub use kdtree::{KdNormalTree, KdTree};

mod registration;
pub use registration::{register_bingham, RegistrationCriteria, RegistrationResult};

mod search;
pub use search::{kd_search, kd_search_normals, NormalSearchResult, SearchResult};
