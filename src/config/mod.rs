pub mod toml_config;

pub use toml_config::ServiceConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "sustain-ai")]
#[command(about = "Inference API for the food-donation platform models")]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long, help = "Directory holding the model artifacts")]
    pub artifacts_dir: Option<String>,

    #[arg(long, help = "The single origin allowed by CORS")]
    pub allowed_origin: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔（若有），再以命令列參數覆蓋
    pub fn load(&self) -> Result<ServiceConfig> {
        let config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };
        Ok(self.apply(config))
    }

    pub fn apply(&self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.artifacts_dir {
            config.artifacts.dir = dir.clone();
        }
        if let Some(origin) = &self.allowed_origin {
            config.server.allowed_origin = origin.clone();
        }
        config
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_file_values() {
        let cli = CliConfig::parse_from([
            "sustain-ai",
            "--port",
            "7000",
            "--artifacts-dir",
            "/data/models",
        ]);
        let file = ServiceConfig::from_toml_str(
            r#"
[server]
host = "0.0.0.0"
port = 5001
"#,
        )
        .unwrap();

        let config = cli.apply(file);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.artifacts.dir, "/data/models");
        assert_eq!(config.server.allowed_origin, "http://localhost:5173");
    }

    #[test]
    fn test_without_config_file_defaults_apply() {
        let cli = CliConfig::parse_from(["sustain-ai", "--verbose"]);
        let config = cli.load().unwrap();
        assert!(cli.verbose);
        assert_eq!(config.server.port, 5001);
    }
}
