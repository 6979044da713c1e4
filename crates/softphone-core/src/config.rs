use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::PhoneError;

pub const DEFAULT_DISPLAY_NAME: &str = "Web Phone";
pub const DEFAULT_REGISTRATION_EXPIRES: u32 = 200;

/// Parameters handed to the signaling stack by `become_ready`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StackConfig {
    pub realm: String,
    /// Private identity used for authentication.
    pub identity: String,
    /// Public identity; derived from `identity` and `realm` when absent.
    #[serde(default)]
    pub public_identity: Option<String>,
    pub password: String,
    pub signaling_proxy_url: String,
    pub outbound_proxy_url: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub ice_servers: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_early_ims: bool,
    #[serde(default = "default_true")]
    pub enable_rtcweb_breaker: bool,
    #[serde(default)]
    pub enable_media_stream_cache: bool,
    #[serde(default)]
    pub bandwidth: Option<u32>,
    #[serde(default = "default_registration_expires")]
    pub registration_expires: u32,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_registration_expires() -> u32 {
    DEFAULT_REGISTRATION_EXPIRES
}

impl StackConfig {
    /// Build a config with the required fields and stock defaults.
    pub fn new(
        realm: impl Into<String>,
        identity: impl Into<String>,
        password: impl Into<String>,
        signaling_proxy_url: impl Into<String>,
        outbound_proxy_url: impl Into<String>,
    ) -> Self {
        Self {
            realm: realm.into(),
            identity: identity.into(),
            public_identity: None,
            password: password.into(),
            signaling_proxy_url: signaling_proxy_url.into(),
            outbound_proxy_url: outbound_proxy_url.into(),
            display_name: default_display_name(),
            ice_servers: Vec::new(),
            enable_early_ims: true,
            enable_rtcweb_breaker: true,
            enable_media_stream_cache: false,
            bandwidth: None,
            registration_expires: DEFAULT_REGISTRATION_EXPIRES,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PhoneError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PhoneError::Config(format!("read {}: {e}", path.display())))?;
        let config: StackConfig = serde_json::from_str(&contents)
            .map_err(|e| PhoneError::Config(format!("parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Public identity, e.g. `sip:alice@example.org`.
    pub fn public_identity(&self) -> String {
        self.public_identity
            .clone()
            .unwrap_or_else(|| format!("sip:{}@{}", self.identity, self.realm))
    }

    /// Check that every required field is present and both proxies parse.
    pub fn validate(&self) -> Result<(), PhoneError> {
        let required = [
            ("realm", &self.realm),
            ("identity", &self.identity),
            ("password", &self.password),
            ("signaling_proxy_url", &self.signaling_proxy_url),
            ("outbound_proxy_url", &self.outbound_proxy_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PhoneError::Config(format!("{name} is required")));
            }
        }

        let signaling = Url::parse(&self.signaling_proxy_url)
            .map_err(|e| PhoneError::Config(format!("signaling_proxy_url: {e}")))?;
        if !matches!(signaling.scheme(), "ws" | "wss") {
            return Err(PhoneError::Config(format!(
                "signaling_proxy_url must use ws or wss, got {}",
                signaling.scheme()
            )));
        }
        Url::parse(&self.outbound_proxy_url)
            .map_err(|e| PhoneError::Config(format!("outbound_proxy_url: {e}")))?;

        if self.registration_expires == 0 {
            return Err(PhoneError::Config("registration_expires must be positive".into()));
        }
        Ok(())
    }
}
