//! Settings schema.
//!
//! Every field is sourced from the environment variable named in its `env`
//! attribute. Fields with defaults may be omitted.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::validation::parse_list;

/// An ordered list of hosts, URLs or origins.
///
/// Accepts either a JSON array of strings or a comma-separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostList(pub Vec<String>);

impl HostList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form, as librdkafka expects for `bootstrap.servers`.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

fn host_list(raw: &str) -> Result<HostList, String> {
    parse_list(raw).map(HostList)
}

/// Root configuration for the service.
#[derive(Debug, Clone, Parser)]
#[command(name = "service-scaffold", version, about = "HTTP service scaffold")]
pub struct Settings {
    /// Service name, used as the tracing resource and the log aggregator tag.
    #[arg(long, env = "PROJECT_NAME")]
    pub project_name: String,

    #[arg(long, env = "DEBUG", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// HTTP listen port.
    #[arg(long, env = "DEFAULT_PORT", default_value_t = 8000)]
    pub default_port: u16,

    /// HTTP listen host.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    // Database (write/read split)
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD")]
    pub db_password: Option<String>,

    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "DB_PORT_WRITE")]
    pub db_port_write: Option<u16>,

    #[arg(long, env = "DB_PORT_READ")]
    pub db_port_read: Option<u16>,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Write database URL. Assembled from the `DB_*` parts when absent.
    #[arg(long, env = "DATABASE_WRITE_URL")]
    pub database_write_url: Option<String>,

    /// Read database URL. Assembled from the `DB_*` parts when absent.
    #[arg(long, env = "DATABASE_READ_URL")]
    pub database_read_url: Option<String>,

    // Observability
    /// OTLP/gRPC collector endpoint (e.g. `http://tempo:4317`).
    #[arg(long, env = "TEMPO_EXPORTER")]
    pub tempo_exporter: Option<String>,

    /// Loki push URL (e.g. `http://loki:3100/loki/api/v1/push`).
    #[arg(long, env = "LOKI_URL")]
    pub loki_url: Option<String>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_CONSOLE", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub log_console: bool,

    #[arg(long, env = "LOG_FILE", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub log_file: bool,

    #[arg(long, env = "LOG_LOKI", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub log_loki: bool,

    #[arg(long, env = "LOG_FILE_PATH", default_value = "logs/app.log")]
    pub log_file_path: PathBuf,

    /// Prometheus listener address; metrics exposition is off when unset.
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    // Kafka ecosystem
    #[arg(long, env = "KAFKA_BROKERS", value_parser = host_list)]
    pub kafka_brokers: HostList,

    #[arg(long, env = "KAFKA_TOPIC_ANALYSIS", default_value = "analysis")]
    pub kafka_topic_analysis: String,

    #[arg(long, env = "KAFKA_CONNECT_URL")]
    pub kafka_connect_url: Option<String>,

    #[arg(long, env = "SCHEMA_REGISTRY_URL")]
    pub schema_registry_url: Option<String>,

    #[arg(long, env = "KAFKA_REST_PROXY_URL")]
    pub kafka_rest_proxy_url: Option<String>,

    // Redis & automation
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: String,

    #[arg(long, env = "N8N_URL")]
    pub n8n_url: Option<String>,

    // Search & AI
    #[arg(long, env = "OPENSEARCH_URL")]
    pub opensearch_url: Option<String>,

    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Allowed cross-origin hosts. Empty means any origin.
    #[arg(long, env = "CORS_ORIGINS", value_parser = host_list, default_value = "")]
    pub cors_origins: HostList,
}

impl Settings {
    /// Fill in the database URLs from their parts.
    ///
    /// An explicit URL always wins. A URL is only assembled when user,
    /// password, host, name and the matching port are all present.
    pub fn assemble_database_urls(&mut self) {
        if self.database_write_url.is_none() {
            self.database_write_url = self.database_url_for(self.db_port_write);
        }
        if self.database_read_url.is_none() {
            self.database_read_url = self.database_url_for(self.db_port_read);
        }
    }

    fn database_url_for(&self, port: Option<u16>) -> Option<String> {
        match (
            &self.db_user,
            &self.db_password,
            &self.db_host,
            &self.db_name,
            port,
        ) {
            (Some(user), Some(password), Some(host), Some(name), Some(port))
                if !user.is_empty() && !host.is_empty() && !name.is_empty() =>
            {
                Some(format!("postgresql://{user}:{password}@{host}:{port}/{name}"))
            }
            _ => None,
        }
    }

    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.default_port)
    }
}
