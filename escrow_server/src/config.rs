use std::env;

use log::*;
use mes_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_MES_HOST: &str = "127.0.0.1";
const DEFAULT_MES_PORT: u16 = 8480;

/// The header carrying the base64-encoded HMAC-SHA256 signature of webhook request bodies.
pub const SIGNATURE_HEADER: &str = "x-marketplace-signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Payment processor webhook configuration
    pub webhook: WebhookConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// The shared secret the payment processor signs webhook bodies with.
    pub hmac_secret: Secret<String>,
    /// If false, the signature check is skipped and every webhook call is allowed. **DANGER**
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MES_HOST.to_string(),
            port: DEFAULT_MES_PORT,
            database_url: String::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MES_HOST").ok().unwrap_or_else(|| DEFAULT_MES_HOST.into());
        let port = env::var("MES_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MES_PORT. {e} Using the default, {DEFAULT_MES_PORT}, instead."
                    );
                    DEFAULT_MES_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MES_PORT);
        let database_url = env::var("MES_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MES_DATABASE_URL is not set. Please set it to the URL for the escrow database.");
            String::default()
        });
        let webhook = WebhookConfig::from_env_or_default();
        Self { host, port, database_url, webhook }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("MES_WEBHOOK_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ MES_WEBHOOK_HMAC_SECRET is not set. Please set it to the signing secret configured at the \
                 payment processor."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("MES_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!(
                "🚨️ Webhook HMAC checks are disabled. Anyone can post payment events to this server. DO NOT run \
                 production like this."
            );
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}
