use std::{collections::HashMap, path::PathBuf, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

use crate::crypto::{self, Credentials};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub private_key_path: PathBuf,
    pub certificate_path: PathBuf,
    #[serde(default)]
    pub server_certificate_path: Option<PathBuf>,
}

impl CredentialsConfig {
    /// Reads the configured files. Parsing happens on first use.
    ///
    /// # Errors
    /// Returns an error if one of the files cannot be read.
    pub fn load(&self) -> Result<Credentials, crypto::Error> {
        Credentials::from_files(
            &self.private_key_path,
            &self.certificate_path,
            self.server_certificate_path.as_deref(),
        )
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default(
                "gateway.endpoint",
                "https://webpay3gint.transbank.cl/webpayserver/wswebpay/OneClickPaymentService",
            )?
            .set_default("gateway.timeout_secs", 30)?
            .set_default("credentials.private_key_path", "keys/client.key")?
            .set_default("credentials.certificate_path", "keys/client.crt")?
            .add_source(File::with_name("config/settings").required(false));

        // Explicit overrides replace the process environment in tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. ONECLICK_GATEWAY__ENDPOINT or ONECLICK_CREDENTIALS__PRIVATE_KEY_PATH
            builder = builder.add_source(
                Environment::with_prefix("ONECLICK")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
