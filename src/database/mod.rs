//! PostgreSQL connection pools.
//!
//! Writes and reads go to separate pools so the read side can point at a
//! replica. Pools are lazy: no connection is opened until the first
//! checkout, and recycled connections are verified before reuse.

use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolError, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("invalid database URL: {0}")]
    InvalidUrl(#[from] tokio_postgres::Error),

    #[error("failed to create pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("failed to check out connection: {0}")]
    Checkout(#[from] PoolError),
}

/// Create a connection pool from a database URL.
pub fn create_pool(database_url: &str) -> Result<Pool, DatabaseError> {
    let pg_config: tokio_postgres::Config = database_url.parse()?;

    let mut cfg = Config::new();
    if let Some(host) = pg_config.get_hosts().first() {
        match host {
            tokio_postgres::config::Host::Tcp(h) => cfg.host = Some(h.clone()),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(p) => {
                cfg.host = Some(p.to_string_lossy().to_string())
            }
        }
    }
    cfg.port = pg_config.get_ports().first().copied();
    cfg.user = pg_config.get_user().map(str::to_string);
    cfg.password = pg_config
        .get_password()
        .map(|pw| String::from_utf8_lossy(pw).to_string());
    cfg.dbname = pg_config.get_dbname().map(str::to_string);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Verified,
    });

    Ok(cfg.create_pool(Some(Runtime::Tokio1), NoTls)?)
}

pub struct Database {
    write: Pool,
    read: Pool,
}

impl Database {
    pub fn connect(write_url: &str, read_url: &str) -> Result<Self, DatabaseError> {
        let database = Self {
            write: create_pool(write_url)?,
            read: create_pool(read_url)?,
        };
        tracing::info!("Database pools created");
        Ok(database)
    }

    pub async fn write(&self) -> Result<Object, DatabaseError> {
        Ok(self.write.get().await?)
    }

    pub async fn read(&self) -> Result<Object, DatabaseError> {
        Ok(self.read.get().await?)
    }

    pub fn write_pool(&self) -> &Pool {
        &self.write
    }

    pub fn read_pool(&self) -> &Pool {
        &self.read
    }
}
