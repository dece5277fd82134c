pub mod api;
pub mod cache;
pub mod client;
pub mod collection;
pub mod fetchers;
pub mod metrics_client;
pub mod quantity;
pub mod views;

/// User agent sent with every cluster API call, tracks the package version
///
/// Overridable at runtime through [`client::USER_AGENT_ENV`].
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
