use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logic::DeltaOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: DeltaOptions,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// JSON workspace snapshot to serve
    pub seed_file: Option<PathBuf>,
    /// Serve the bundled demo workspace when no seed file is given
    pub load_demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3011,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            seed_file: None,
            load_demo: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `product-delta` file and
    /// `PDELTA_*` environment variables (`PDELTA_SERVER__PORT=4000`)
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("product-delta").required(false));

        config = config.add_source(
            config::Environment::with_prefix("PDELTA")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("engine.passes")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
