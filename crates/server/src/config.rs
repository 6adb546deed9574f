use std::path::PathBuf;

use clap::Parser;
use qiitadl_core::{ExtractConfig, FetchConfig, MarkdownConfig, PipelineConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "qiitadl-server")]
#[command(about = "Serves Qiita articles as Markdown zip archives", long_about = None)]
pub struct Config {
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "SERVER_PORT", default_value = "8080")]
    pub port: u16,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Articles are accepted from this host and its subdomains
    #[arg(long, env = "ALLOWED_DOMAIN", default_value = qiitadl_core::QIITA_DOMAIN)]
    pub allowed_domain: String,

    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "30")]
    pub fetch_timeout: u64,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "300")]
    pub request_timeout: u64,

    #[arg(long, env = "ASSET_CONCURRENCY", default_value = "4")]
    pub asset_concurrency: usize,

    #[arg(long, env = "MAX_ASSET_BYTES", default_value = "20971520")]
    pub max_asset_bytes: usize,

    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    #[arg(long, env = "CORS_ORIGINS", default_value = "")]
    pub cors_origins: String,

    /// Parent of the per-request working directories (system temp dir if unset)
    #[arg(long, env = "WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::parse()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig {
            timeout: self.fetch_timeout,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            max_asset_bytes: self.max_asset_bytes,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            extract: ExtractConfig { asset_concurrency: self.asset_concurrency, ..Default::default() },
            markdown: MarkdownConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["qiitadl-server", "--log-level", "info"]).unwrap();

        assert_eq!(config.allowed_domain, "qiita.com");
        assert_eq!(config.fetch_timeout, 30);
        assert_eq!(config.max_asset_bytes, 20 * 1024 * 1024);
        assert_eq!(config.fetch_config().timeout, 30);
        assert_eq!(config.pipeline_config().extract.asset_concurrency, config.asset_concurrency);
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "qiitadl-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--user-agent",
            "test-agent",
            "--asset-concurrency",
            "2",
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.fetch_config().user_agent, "test-agent");
        assert_eq!(config.pipeline_config().extract.asset_concurrency, 2);
    }
}
