use proj_sys_reproject::ProjError;
use thiserror::Error;

/// Stage setup failures.
///
/// All stage construction problems surface here, synchronously, before any
/// streaming happens. When attachment fails the pipeline chain is left
/// untouched and reusable.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("attribute name is empty")]
    EmptyAttributeName,

    #[error("comparison value set is empty")]
    EmptySet,

    #[error("comparison value set mixes numeric and text values")]
    MixedSetDomains,

    #[error("invalid region of interest definition {0:?}, expected \"x0,y0,z0,dx,dy,dz,rx,ry,rz\"")]
    InvalidRoi(String),

    #[error("subsampling stride must be at least 1")]
    ZeroStride,

    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("failed to set up CRS transform")]
    Reprojection(#[from] ProjError),
}
