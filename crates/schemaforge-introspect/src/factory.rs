use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use schemaforge_core::{ConnectionDescriptor, Dialect, Error, Result};

use crate::introspector::SchemaIntrospector;
use crate::mysql::MySqlIntrospector;
use crate::options::IntrospectOptions;
use crate::postgres::PostgresIntrospector;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// An open connection pool for one of the supported dialects.
#[derive(Debug, Clone)]
pub enum DatabaseHandle {
    Postgres(PgPool),
    MySql(MySqlPool),
}

/// Open a pool for the descriptor's dialect.
///
/// Unsupported dialects are rejected before any connection attempt.
pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<DatabaseHandle> {
    ensure_supported(descriptor.dialect)?;

    info!(
        dialect = %descriptor.dialect,
        host = %descriptor.host,
        database = %descriptor.database,
        "connecting"
    );

    match descriptor.dialect {
        Dialect::Postgres => {
            let pool_options = PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(ACQUIRE_TIMEOUT);
            let pool = match &descriptor.url {
                Some(url) => pool_options.connect(url).await,
                None => pool_options.connect_with(pg_options(descriptor)).await,
            }
            .map_err(|err| Error::Db(err.to_string()))?;
            Ok(DatabaseHandle::Postgres(pool))
        }
        Dialect::MySql => {
            let pool_options = MySqlPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(ACQUIRE_TIMEOUT);
            let pool = match &descriptor.url {
                Some(url) => pool_options.connect(url).await,
                None => pool_options.connect_with(mysql_options(descriptor)).await,
            }
            .map_err(|err| Error::Db(err.to_string()))?;
            Ok(DatabaseHandle::MySql(pool))
        }
        Dialect::Mssql => Err(unsupported(Dialect::Mssql)),
    }
}

/// Whether the dialect can be introspected by this build.
pub fn ensure_supported(dialect: Dialect) -> Result<()> {
    match dialect {
        Dialect::Postgres | Dialect::MySql => Ok(()),
        Dialect::Mssql => Err(unsupported(dialect)),
    }
}

fn unsupported(dialect: Dialect) -> Error {
    Error::Unsupported(format!(
        "introspection for dialect '{dialect}' is not implemented"
    ))
}

fn pg_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.effective_port())
        .username(&descriptor.username)
        .database(&descriptor.database);
    if let Some(password) = &descriptor.password {
        options = options.password(password);
    }
    options
}

fn mysql_options(descriptor: &ConnectionDescriptor) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.effective_port())
        .username(&descriptor.username)
        .database(&descriptor.database);
    if let Some(password) = &descriptor.password {
        options = options.password(password);
    }
    options
}

impl DatabaseHandle {
    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseHandle::Postgres(_) => Dialect::Postgres,
            DatabaseHandle::MySql(_) => Dialect::MySql,
        }
    }

    /// Build the dialect's introspector. A descriptor schema narrows the
    /// listing when the options do not already name schemas.
    pub fn introspector(
        &self,
        descriptor: &ConnectionDescriptor,
        mut options: IntrospectOptions,
    ) -> Box<dyn SchemaIntrospector> {
        if options.schemas.is_none() {
            options.schemas = descriptor.schema.clone().map(|schema| vec![schema]);
        }
        match self {
            DatabaseHandle::Postgres(pool) => {
                Box::new(PostgresIntrospector::new(pool.clone(), options))
            }
            DatabaseHandle::MySql(pool) => Box::new(MySqlIntrospector::new(pool.clone(), options)),
        }
    }

    /// Round-trip a trivial query to prove the connection works.
    pub async fn ping(&self) -> Result<()> {
        let outcome = match self {
            DatabaseHandle::Postgres(pool) => sqlx::query("select 1").execute(pool).await.map(|_| ()),
            DatabaseHandle::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        outcome.map_err(|err| Error::Db(err.to_string()))
    }

    pub async fn close(&self) {
        match self {
            DatabaseHandle::Postgres(pool) => pool.close().await,
            DatabaseHandle::MySql(pool) => pool.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mssql_is_rejected_before_connecting() {
        let descriptor = ConnectionDescriptor {
            dialect: Dialect::Mssql,
            // Unroutable: a connection attempt would hang until timeout.
            host: "10.255.255.1".to_string(),
            ..ConnectionDescriptor::default()
        };
        let err = connect(&descriptor).await.expect_err("mssql must be rejected");
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn supported_dialects_pass_the_check() {
        assert!(ensure_supported(Dialect::Postgres).is_ok());
        assert!(ensure_supported(Dialect::MySql).is_ok());
        assert!(ensure_supported(Dialect::Mssql).is_err());
    }
}
