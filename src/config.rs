use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the supply-chain connector
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplyChainConfig {
    /// Ledger network settings
    pub ledger: LedgerConfig,
    /// Timeouts applied to ledger calls
    pub dispatch: DispatchConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Member (organization) the connector signs for
    pub member_name: Option<String>,
    /// Channel hosting the contract
    pub channel_name: String,
    /// Contract name on the channel
    pub chaincode_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Read-only query timeout
    pub query_timeout_seconds: u64,
    /// Time allowed for endorsement of a transaction
    pub endorse_timeout_seconds: u64,
    /// Time allowed for the commit after endorsement
    pub commit_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            member_name: None,
            channel_name: "mainchannel".to_string(),
            chaincode_id: "supplychaincc".to_string(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            query_timeout_seconds: 10,
            endorse_timeout_seconds: 20,
            commit_timeout_seconds: 60,
        }
    }
}

impl DispatchConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    /// A submit covers both endorsement and commit.
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.endorse_timeout_seconds + self.commit_timeout_seconds)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl SupplyChainConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (supply-chain.toml, .supply-chain-rc)
    /// 3. Environment variables (prefixed with SUPPLY_CHAIN_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("supply-chain.toml").exists() {
            builder = builder.add_source(File::with_name("supply-chain"));
        }

        if Path::new(".supply-chain-rc").exists() {
            builder = builder.add_source(
                File::with_name(".supply-chain-rc").format(config::FileFormat::Toml),
            );
        }

        // SUPPLY_CHAIN_DISPATCH__QUERY_TIMEOUT_SECONDS=5
        builder = builder.add_source(
            Environment::with_prefix("SUPPLY_CHAIN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut supply_chain_config: SupplyChainConfig = builder.build()?.try_deserialize()?;

        // The deployed connector reads its member from MEMBER_NAME
        if supply_chain_config.ledger.member_name.is_none() {
            if let Ok(member) = std::env::var("MEMBER_NAME") {
                supply_chain_config.ledger.member_name = Some(member);
            }
        }

        Ok(supply_chain_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<SupplyChainConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = SupplyChainConfig::load_env_file();
        SupplyChainConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static SupplyChainConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
