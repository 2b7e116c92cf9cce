// Copyright 2023 Remi Bernotavicius

use diesel::connection::SimpleConnection as _;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;
use std::time::Duration;

#[cfg(test)]
pub mod fixtures;
pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database path {0:?} is not valid UTF-8")]
    InvalidPath(std::path::PathBuf),

    #[error("connection pool needs at least one connection")]
    EmptyPool,

    #[error("failed to open connection pool: {0}")]
    Pool(#[from] PoolError),

    #[error("failed to configure database: {0}")]
    Configure(#[source] diesel::result::Error),

    #[error("failed to run migrations: {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync + 'static>),
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub pool_size: u32,
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Applied to every connection as the pool hands it out.
#[derive(Debug)]
struct ConnectionSettings {
    busy_timeout: Duration,
}

impl CustomizeConnection<Connection, diesel::r2d2::Error> for ConnectionSettings {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Handle to the catalog database. Cloning it is cheap and every clone shares the same pool of
/// connections, so one handle can be given to any number of concurrent callers.
#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<Connection>>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let url = path
            .to_str()
            .ok_or_else(|| StoreError::InvalidPath(path.to_owned()))?;
        if options.pool_size == 0 {
            return Err(StoreError::EmptyPool);
        }

        let pool = Pool::builder()
            .max_size(options.pool_size)
            .connection_customizer(Box::new(ConnectionSettings {
                busy_timeout: options.busy_timeout,
            }))
            .build(ConnectionManager::<Connection>::new(url))?;

        let mut conn = pool.get()?;
        let conn: &mut Connection = &mut conn;
        conn.batch_execute("PRAGMA journal_mode = WAL;")
            .map_err(StoreError::Configure)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(StoreError::Migration)?;
        log::info!(
            "opened catalog at {} ({} migrations applied)",
            path.display(),
            applied.len()
        );

        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<PooledConnection<ConnectionManager<Connection>>, PoolError> {
        self.pool.get()
    }

    pub fn max_connections(&self) -> u32 {
        self.pool.max_size()
    }
}

#[test]
fn migrations() {
    use diesel::prelude::Connection as _;
    use std::{env, fs};

    let database_path = env::temp_dir().join(format!("migrations-{}.sqlite", std::process::id()));
    if database_path.exists() {
        fs::remove_file(&database_path).unwrap();
    }

    let mut conn = Connection::establish(database_path.to_str().unwrap()).unwrap();
    for _ in 0..2 {
        conn.run_pending_migrations(MIGRATIONS).unwrap();
        assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
        conn.revert_all_migrations(MIGRATIONS).unwrap();
        assert!(conn.has_pending_migration(MIGRATIONS).unwrap());
    }

    drop(conn);
    fs::remove_file(&database_path).unwrap();
}

#[test]
fn open_seeds_fallback_cuisine() {
    use diesel::{QueryDsl as _, RunQueryDsl as _, SelectableHelper as _};

    let store = fixtures::TestStore::empty();
    let conn: &mut Connection = &mut store.conn().unwrap();
    let fallback = schema::cuisines::table
        .find(models::CuisineId::FALLBACK)
        .select(models::Cuisine::as_select())
        .first(conn)
        .unwrap();
    assert_eq!(fallback.name, "International");
}

#[test]
fn open_rejects_empty_pool() {
    let path = std::env::temp_dir().join(format!("empty-pool-{}.sqlite", std::process::id()));
    let options = StoreOptions {
        pool_size: 0,
        ..Default::default()
    };
    assert!(matches!(
        Store::open(&path, &options),
        Err(StoreError::EmptyPool)
    ));
    assert!(!path.exists());
}
