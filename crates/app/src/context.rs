//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    clock::SystemClock,
    database::{self, Db},
    domain::{Stores, carts::CartsService},
    lifecycle::OrderLifecycle,
    payments::SandboxGateway,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// Process-wide services, wired once at startup.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub stores: Stores,
    pub carts: CartsService,
    pub lifecycle: Arc<OrderLifecycle>,
}

impl AppContext {
    /// Wires the given stores to the sandbox gateway and the system clock.
    #[must_use]
    pub fn new(stores: Stores) -> Self {
        let carts = CartsService::new(stores.carts.clone(), stores.products.clone());

        let lifecycle = OrderLifecycle::new(
            stores.clone(),
            Arc::new(SandboxGateway::new()),
            Arc::new(SystemClock),
        );

        Self {
            stores,
            carts,
            lifecycle: Arc::new(lifecycle),
        }
    }

    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::new(Stores::postgres(&Db::new(pool))))
    }
}
