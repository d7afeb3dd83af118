//! Transport client: configuration, channel establishment, and bearer auth.
//!
//! One [`Connection`] lives for the duration of a single Host invocation.
//! The channel and the bearer token are established lazily on first use and
//! then shared by every handler in that invocation; there is no pooling
//! across invocations and no retry logic (the transport's own semantics
//! apply). The endpoint host and port suffix are joined verbatim, without
//! URL parsing.

use crate::error::ProviderError;
use crate::translate::Plan;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

/// Default Platform host.
pub const DEFAULT_ENDPOINT: &str = "api.cloud.arangodb.com";
/// Default port suffix, including the leading colon.
pub const DEFAULT_PORT_SUFFIX: &str = ":443";

const ENV_API_KEY_ID: &str = "OASIS_API_KEY_ID";
const ENV_API_KEY_SECRET: &str = "OASIS_API_KEY_SECRET";
const ENV_ENDPOINT: &str = "OASIS_ENDPOINT";
const ENV_PORT_SUFFIX: &str = "OASIS_PORT_SUFFIX";
const ENV_ORGANIZATION: &str = "OASIS_ORGANIZATION";
const ENV_PROJECT: &str = "OASIS_PROJECT";

/// Provider-level configuration, sourced from plan attributes with
/// environment-variable fallbacks.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Authentication key identifier.
    pub api_key_id: String,
    /// Authentication key secret.
    pub api_key_secret: String,
    /// Host name of the Platform.
    pub endpoint: String,
    /// Port suffix including the leading colon.
    pub api_port_suffix: String,
    /// Default organization id for kinds that omit `organization`.
    pub organization: String,
    /// Default project id for kinds that omit `project`.
    pub project: String,
}

impl ProviderConfig {
    /// Resolve configuration from the provider block of the plan.
    ///
    /// Each attribute falls back to its environment variable; endpoint and
    /// port suffix additionally fall back to the documented defaults. The
    /// key pair is required.
    pub fn from_plan(plan: &Plan) -> Result<Self, ProviderError> {
        let api_key_id = attr_or_env(plan, "api_key_id", ENV_API_KEY_ID);
        if api_key_id.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "api_key_id is required (or set {})",
                ENV_API_KEY_ID
            )));
        }
        let api_key_secret = attr_or_env(plan, "api_key_secret", ENV_API_KEY_SECRET);
        if api_key_secret.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "api_key_secret is required (or set {})",
                ENV_API_KEY_SECRET
            )));
        }

        let mut endpoint = attr_or_env(plan, "oasis_endpoint", ENV_ENDPOINT);
        if endpoint.is_empty() {
            endpoint = DEFAULT_ENDPOINT.to_string();
        }
        let mut api_port_suffix = attr_or_env(plan, "api_port_suffix", ENV_PORT_SUFFIX);
        if api_port_suffix.is_empty() {
            api_port_suffix = DEFAULT_PORT_SUFFIX.to_string();
        }

        Ok(Self {
            api_key_id,
            api_key_secret,
            endpoint,
            api_port_suffix,
            organization: attr_or_env(plan, "organization", ENV_ORGANIZATION),
            project: attr_or_env(plan, "project", ENV_PROJECT),
        })
    }

    /// The dial target: endpoint and port suffix joined verbatim.
    pub fn host(&self) -> String {
        format!("{}{}", self.endpoint, self.api_port_suffix)
    }
}

fn attr_or_env(plan: &Plan, key: &str, env: &str) -> String {
    let value = plan.optional_string(key);
    if !value.is_empty() {
        return value;
    }
    std::env::var(env).unwrap_or_default()
}

/// Exchanges an API key pair for a short-lived bearer token.
///
/// The concrete implementation calls the Platform's authentication stub and
/// lives with the generated clients; it is a collaborator of the core.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Obtain a bearer token for the given key pair.
    async fn exchange(
        &self,
        channel: Channel,
        key_id: &str,
        key_secret: &str,
    ) -> Result<String, ProviderError>;
}

/// A lazily-established, authenticated channel to the Platform.
///
/// Initialization is confined to first use: concurrent handlers observe
/// either the fully initialized handle or the initialization error, never a
/// partially built one.
pub struct Connection {
    config: ProviderConfig,
    exchanger: Arc<dyn TokenExchanger>,
    channel: OnceCell<Channel>,
    bearer: OnceCell<MetadataValue<Ascii>>,
}

impl Connection {
    /// Create a connection; nothing is dialed until first use.
    pub fn new(config: ProviderConfig, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            config,
            exchanger,
            channel: OnceCell::new(),
            bearer: OnceCell::new(),
        }
    }

    /// The configuration this connection was built from.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The shared channel, dialing on first use.
    pub async fn channel(&self) -> Result<Channel, ProviderError> {
        self.channel
            .get_or_try_init(|| async {
                let target = format!("https://{}", self.config.host());
                debug!(target = %target, "dialing platform");
                let endpoint = Endpoint::from_shared(target)?
                    .tls_config(ClientTlsConfig::new().with_native_roots())?;
                let channel = endpoint.connect().await?;
                Ok::<_, ProviderError>(channel)
            })
            .await
            .cloned()
    }

    /// Wrap a request message with the bearer token attached.
    ///
    /// The Host's cancellation signal propagates through the returned
    /// request unchanged; no local deadline is set.
    pub async fn authenticated<T>(&self, message: T) -> Result<tonic::Request<T>, ProviderError> {
        let bearer = self.bearer().await?;
        let mut request = tonic::Request::new(message);
        request.metadata_mut().insert("authorization", bearer);
        Ok(request)
    }

    async fn bearer(&self) -> Result<MetadataValue<Ascii>, ProviderError> {
        self.bearer
            .get_or_try_init(|| async {
                let channel = self.channel().await?;
                let token = self
                    .exchanger
                    .exchange(channel, &self.config.api_key_id, &self.config.api_key_secret)
                    .await?;
                debug!("bearer token obtained");
                MetadataValue::try_from(format!("bearer {}", token)).map_err(|e| {
                    ProviderError::Configuration(format!("invalid bearer token: {}", e))
                })
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    #[test]
    fn test_config_requires_key_pair() {
        std::env::remove_var(ENV_API_KEY_ID);
        std::env::remove_var(ENV_API_KEY_SECRET);
        let err = ProviderConfig::from_plan(&plan(json!({}))).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_config_defaults_and_verbatim_join() {
        let config = ProviderConfig::from_plan(&plan(json!({
            "api_key_id": "key",
            "api_key_secret": "secret",
        })))
        .unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api_port_suffix, DEFAULT_PORT_SUFFIX);
        assert_eq!(config.host(), "api.cloud.arangodb.com:443");
    }

    #[test]
    fn test_config_plan_overrides_env() {
        std::env::set_var(ENV_ENDPOINT, "env.example.com");
        let config = ProviderConfig::from_plan(&plan(json!({
            "api_key_id": "key",
            "api_key_secret": "secret",
            "oasis_endpoint": "plan.example.com",
            "api_port_suffix": ":8443",
        })))
        .unwrap();
        assert_eq!(config.host(), "plan.example.com:8443");
        std::env::remove_var(ENV_ENDPOINT);
    }
}
