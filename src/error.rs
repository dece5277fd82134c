use derive_more::From;
use k8s_openapi::serde_json;

use crate::k8s::cache::CacheError;
use crate::k8s::quantity::QuantityError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    #[from]
    Json(serde_json::Error),

    /// The cluster API call failed
    #[from]
    Kube(kube::Error),

    #[from]
    Infer(kube::config::InferConfigError),

    /// The cache backend could not be reached or rejected the command
    #[from]
    Cache(CacheError),

    /// A resource quantity did not match the quantity grammar
    #[from]
    Quantity(QuantityError),

    /// Custom error message
    Custom(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Self::Json(e) => write!(fmt, "json: {e}"),
            Self::Kube(e) => write!(fmt, "cluster api: {e}"),
            Self::Infer(e) => write!(fmt, "kubeconfig: {e}"),
            Self::Cache(e) => write!(fmt, "{e}"),
            Self::Quantity(e) => write!(fmt, "{e}"),
            Self::Custom(message) => write!(fmt, "{message}"),
        }
    }
}

impl std::error::Error for Error {}
