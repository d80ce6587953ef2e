use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use sqlx::pool::PoolOptions;
use sqlx::MySqlPool;
use tokio::sync::watch;

use crate::auth::Authorization;
use crate::config::Config;
use crate::store::Store;
use crate::telegram::Notifier;

#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    pub fn new(config: Config, shutdown_rx: watch::Receiver<bool>) -> Self {
        let pool: MySqlPool = PoolOptions::new()
            .max_connections(8)
            .max_lifetime(Duration::new(3600, 0))
            .idle_timeout(Duration::new(60, 0))
            .connect_lazy(&config.database.connect_string())
            .unwrap();

        let store = Store {
            pool,
            table_prefix: config.database.prefix.clone(),
        };

        let auth = Authorization::new(Algorithm::HS256);
        let notifier = Notifier::new(config.telegram.clone());

        Self(Arc::new(StateInner {
            store,
            config,
            auth,
            notifier,
            shutdown_rx,
        }))
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub store: Store,
    pub config: Config,
    pub auth: Authorization,
    pub notifier: Notifier,
    pub shutdown_rx: watch::Receiver<bool>,
}
