//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the external clients from settings
//! - Connect them in dependency order (cache, then broker)
//! - Tear them down in reverse order
//!
//! # Design Decisions
//! - A dependency that cannot be reached is logged, not fatal
//! - Database pools are lazy, so building them never touches the network

use std::sync::Arc;

use crate::broker::ProducerClient;
use crate::cache::CacheClient;
use crate::config::Settings;
use crate::database::Database;
use crate::http::AppState;

/// External clients shared by the whole process.
pub struct Services {
    pub cache: Arc<CacheClient>,
    pub producer: Arc<ProducerClient>,
    pub database: Option<Arc<Database>>,
}

impl Services {
    /// Build the clients without connecting anything.
    pub fn from_settings(settings: &Settings) -> Self {
        let database = match (&settings.database_write_url, &settings.database_read_url) {
            (Some(write), Some(read)) => match Database::connect(write, read) {
                Ok(db) => Some(Arc::new(db)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create database pools");
                    None
                }
            },
            _ => {
                tracing::info!("Database URLs not configured, skipping database pools");
                None
            }
        };

        Self {
            cache: Arc::new(CacheClient::new(settings.redis_url.clone())),
            producer: Arc::new(ProducerClient::new(settings.kafka_brokers.clone())),
            database,
        }
    }

    pub fn app_state(&self, settings: Arc<Settings>) -> AppState {
        AppState {
            settings,
            cache: Arc::clone(&self.cache),
            producer: Arc::clone(&self.producer),
            database: self.database.clone(),
        }
    }
}

/// Build and connect every client.
pub async fn start_services(settings: &Settings) -> Services {
    let services = Services::from_settings(settings);
    services.cache.start().await;
    services.producer.start().await;
    services
}

/// Release every client in reverse start order.
pub async fn stop_services(services: &Services) {
    services.producer.stop().await;
    services.cache.stop().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn settings(extra: &[&str]) -> Settings {
        let mut args = vec![
            "service-scaffold",
            "--project-name",
            "demo",
            "--redis-url",
            "redis://127.0.0.1:1",
            "--kafka-brokers",
            "127.0.0.1:1",
        ];
        args.extend_from_slice(extra);
        let mut settings = Settings::try_parse_from(args).unwrap();
        settings.assemble_database_urls();
        settings
    }

    #[test]
    fn test_database_skipped_without_urls() {
        let mut settings = settings(&[]);
        settings.database_write_url = None;
        settings.database_read_url = None;
        let services = Services::from_settings(&settings);
        assert!(services.database.is_none());
        assert!(!services.cache.is_connected());
        assert!(!services.producer.is_connected());
    }

    #[test]
    fn test_database_built_from_urls() {
        let services = Services::from_settings(&settings(&[
            "--database-write-url",
            "postgresql://app:pw@127.0.0.1:5432/app",
            "--database-read-url",
            "postgresql://app:pw@127.0.0.1:5433/app",
        ]));
        assert!(services.database.is_some());
    }
}
