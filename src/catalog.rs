// Copyright 2023 Remi Bernotavicius

//! Lookups and edits of the recipe catalog, addressed by names and titles instead of ids.

use crate::database::{self, Store};
use diesel::Connection as _;

mod aggregate;
mod error;
mod listing;
mod mutate;
mod resolve;

pub use error::{CatalogError, EntityKind, ErrorKind, Result};

/// Entry point for every catalog operation.
///
/// Holds no state besides the injected store handle; each operation checks a connection out of
/// the pool for as long as it needs one, so a `Catalog` can be shared between threads.
#[derive(Clone)]
pub struct Catalog {
    store: Store,
}

impl Catalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut database::Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.store.conn()?;
        let conn: &mut database::Connection = &mut conn;
        f(conn)
    }

    /// Runs `f` in a deferred transaction, so every read in `f` sees the same snapshot.
    fn read<T>(&self, f: impl FnOnce(&mut database::Connection) -> Result<T>) -> Result<T> {
        self.with_conn(|conn| conn.transaction(f))
    }

    /// Runs `f` in an immediate transaction. Nothing `f` wrote is kept unless it returns `Ok`.
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut database::Connection) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.store.conn()?;
        let conn: &mut database::Connection = &mut conn;
        conn.immediate_transaction(f)
    }
}
