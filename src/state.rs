use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::{PinDelivery, TokenIssuer};
use crate::config::Config;
use crate::store::{DynPostStore, DynUserStore, InMemoryStore, SqlitePostStore, SqliteUserStore};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub posts: DynPostStore,
    pub users: DynUserStore,
    pub tokens: Arc<TokenIssuer>,
    pub pins: Arc<dyn PinDelivery>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        posts: DynPostStore,
        users: DynUserStore,
        pins: Arc<dyn PinDelivery>,
    ) -> Self {
        let tokens = TokenIssuer::new(config.jwt_secret(), config.auth.token_hours);
        Self {
            posts,
            users,
            tokens: Arc::new(tokens),
            pins,
            config,
        }
    }

    pub fn with_sqlite(config: Config, pool: DbPool, pins: Arc<dyn PinDelivery>) -> Self {
        let posts = Arc::new(SqlitePostStore::new(pool.clone()));
        let users = Arc::new(SqliteUserStore::new(pool));
        Self::new(config, posts, users, pins)
    }

    pub fn in_memory(config: Config, pins: Arc<dyn PinDelivery>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(config, store.clone(), store, pins)
    }
}
