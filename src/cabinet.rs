//! Cabinet - the async handle application code talks to.
//!
//! A `Cabinet` is constructed explicitly and passed to whoever needs it;
//! clones share one store context. The backing store is opened lazily on the
//! first operation, and a failed open is permanent for that handle.
//!
//! ## Example
//!
//! ```ignore
//! use cabinet::{Cabinet, CabinetConfig, FileStore, Query, Registry};
//!
//! let registry = Registry::builder()
//!     .register::<Invoice>()
//!     .register::<LineItem>()
//!     .build()?;
//! let cabinet: Cabinet<FileStore> = Cabinet::new(CabinetConfig::default(), registry);
//!
//! cabinet.insert(invoice).await?;
//! cabinet.save().await?;
//! let open: Vec<Invoice> = cabinet.fetch(Query::all()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::CabinetConfig;
use crate::context::{ContextState, StoreContext};
use crate::delivery::Delivery;
use crate::error::{CabinetError, Result, StoreResult};
use crate::query::Query;
use crate::registry::Registry;
use crate::storable::{Row, Storable};
use crate::store::{BackingStore, OpenStore};

type Opener<B> = Arc<dyn Fn(&CabinetConfig) -> StoreResult<B> + Send + Sync>;

struct Inner<B> {
    config: CabinetConfig,
    registry: Arc<Registry>,
    opener: Option<Opener<B>>,
    context: OnceCell<Result<Arc<StoreContext<B>>>>,
    delivery: Delivery,
}

/// Shared, dependency-injected handle over one store context.
pub struct Cabinet<B> {
    inner: Arc<Inner<B>>,
    timeout: Option<Duration>,
}

impl<B> Clone for Cabinet<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<B: OpenStore> Cabinet<B> {
    /// Handle whose backing store opens from `config` on first use.
    pub fn new(config: CabinetConfig, registry: Registry) -> Self {
        let opener: Opener<B> = Arc::new(|config: &CabinetConfig| B::open_or_create(config));
        Self::build(config, Arc::new(registry), Some(opener), OnceCell::new())
    }
}

impl<B: BackingStore> Cabinet<B> {
    /// Handle over an already opened backing store.
    pub fn with_store(store: B, config: CabinetConfig, registry: Registry) -> Self {
        let registry = Arc::new(registry);
        let context = StoreContext::new(store, Arc::clone(&registry), config.clone());
        Self::build(config, registry, None, OnceCell::new_with(Some(Ok(Arc::new(context)))))
    }

    fn build(
        config: CabinetConfig,
        registry: Arc<Registry>,
        opener: Option<Opener<B>>,
        context: OnceCell<Result<Arc<StoreContext<B>>>>,
    ) -> Self {
        Self {
            timeout: config.operation_timeout,
            inner: Arc::new(Inner {
                config,
                registry,
                opener,
                context,
                delivery: Delivery::new(),
            }),
        }
    }

    /// A handle sharing this store whose operations give up after `timeout`.
    ///
    /// The abandoned operation still runs to completion in the background.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: Some(timeout),
        }
    }

    pub fn config(&self) -> &CabinetConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn delivery(&self) -> &Delivery {
        &self.inner.delivery
    }

    pub fn state(&self) -> ContextState {
        match self.inner.context.get() {
            None => ContextState::Uninitialized,
            Some(Err(_)) => ContextState::Failed,
            Some(Ok(context)) => context.state(),
        }
    }

    /// Open the backing store now instead of on first use.
    pub async fn open(&self) -> Result<()> {
        self.context().await.map(|_| ())
    }

    pub async fn fetch<R: Storable>(&self, query: Query) -> Result<Vec<R>> {
        self.run(move |ctx| ctx.fetch::<R>(&query)).await
    }

    pub async fn fetch_all<R: Storable>(&self) -> Result<Vec<R>> {
        self.fetch(Query::all()).await
    }

    /// Untyped rows of a registered entity.
    pub async fn rows(&self, entity: impl Into<String>, query: Query) -> Result<Vec<Row>> {
        let entity = entity.into();
        self.run(move |ctx| ctx.rows(&entity, &query)).await
    }

    pub async fn insert<R: Storable>(&self, record: R) -> Result<bool> {
        self.run(move |ctx| ctx.insert(&record)).await
    }

    pub async fn update<R: Storable>(&self, records: Vec<R>) -> Result<bool> {
        self.run(move |ctx| ctx.update(&records)).await
    }

    pub async fn delete<R: Storable>(&self, records: Vec<R>) -> Result<bool> {
        self.run(move |ctx| ctx.delete(&records)).await
    }

    pub async fn delete_ids(&self, entity: impl Into<String>, ids: Vec<Uuid>) -> Result<bool> {
        let entity = entity.into();
        self.run(move |ctx| ctx.delete_ids(&entity, &ids)).await
    }

    pub async fn save(&self) -> Result<bool> {
        self.run(|ctx| ctx.save()).await
    }

    pub async fn has_changes(&self) -> Result<bool> {
        self.run(|ctx| ctx.has_changes()).await
    }

    /// Drop staged changes without touching the backing store.
    pub async fn discard_changes(&self) -> Result<()> {
        self.run(|ctx| ctx.discard_changes()).await
    }

    async fn context(&self) -> Result<Arc<StoreContext<B>>> {
        self.inner
            .context
            .get_or_init(|| self.open_context())
            .await
            .clone()
    }

    async fn open_context(&self) -> Result<Arc<StoreContext<B>>> {
        let Some(opener) = self.inner.opener.clone() else {
            return Err(CabinetError::StoreUnavailable(
                "no backing store configured".into(),
            ));
        };
        let config = self.inner.config.clone();
        let registry = Arc::clone(&self.inner.registry);
        let store_name = config.store_name.clone();

        let opened = tokio::task::spawn_blocking(move || {
            let store = opener(&config)?;
            Ok::<_, crate::error::StoreError>(StoreContext::new(store, registry, config))
        })
        .await;

        match opened {
            Ok(Ok(context)) => {
                info!(store = %store_name, "store ready");
                Ok(Arc::new(context))
            }
            Ok(Err(err)) => {
                error!(store = %store_name, error = %err, "failed to open store");
                Err(CabinetError::StoreUnavailable(err.to_string()))
            }
            Err(err) => {
                error!(store = %store_name, error = %err, "store open task failed");
                Err(CabinetError::StoreUnavailable(err.to_string()))
            }
        }
    }

    /// Run `op` against the context on the blocking pool, bounded by the
    /// handle's timeout.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreContext<B>) -> Result<T> + Send + 'static,
    {
        let context = self.context().await?;
        let task = tokio::task::spawn_blocking(move || op(&context));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| CabinetError::TimedOut(limit))?,
            None => task.await,
        };
        joined.map_err(|_| CabinetError::Cancelled)?
    }
}
