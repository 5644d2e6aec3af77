//! Error types for geb-fem

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FemError>;

#[derive(Error, Debug)]
pub enum FemError {
    #[error("triad interpolation needs at least 2 nodes, got {0}")]
    TooFewNodes(usize),

    #[error("unsupported interpolation order: {0} nodes")]
    UnsupportedOrder(usize),
}
