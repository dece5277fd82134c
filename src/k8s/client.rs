// Client creation with custom user-agent support for kube 2.x
use crate::error::Result;
use hyper::http::{HeaderName, HeaderValue};
use kube::{Client, Config};
use tracing::warn;

/// Environment variable overriding the user agent sent to the API server
pub const USER_AGENT_ENV: &str = "K8S_STATUS_USER_AGENT";

/// Resolve the user agent: the environment override wins over `default`
#[must_use]
pub fn resolve_user_agent(default: &str) -> String {
    std::env::var(USER_AGENT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Add a user-agent header to `config`, ignoring values that are not valid headers
pub fn add_user_agent_header(config: &mut Config, user_agent: &str) {
    match HeaderValue::from_str(user_agent) {
        Ok(value) => config.headers.push((HeaderName::from_static("user-agent"), value)),
        Err(e) => warn!("ignoring invalid user agent {:?}: {}", user_agent, e),
    }
}

/// Create the k8s client used for every cluster API call of this process
///
/// # Errors
///
/// Will return `Err` if no kubeconfig or in-cluster config can be inferred
pub async fn new(user_agent: Option<&str>) -> Result<Client> {
    let mut config = Config::infer().await?;

    if let Some(user_agent) = user_agent {
        add_user_agent_header(&mut config, &resolve_user_agent(user_agent));
    }

    let client = Client::try_from(config)?;
    Ok(client)
}
