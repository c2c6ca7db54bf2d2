use std::time::{Duration, Instant};

use crate::database::{Row, Store, StoreError};
use crate::filter::{PageWindow, PredicateNode, ResolvedSort};
use crate::schema::EntitySchema;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorSettings {
    pub query_timeout: Option<Duration>,
    pub slow_query_threshold: Option<Duration>,
}

/// What the two reads returned
#[derive(Debug, Clone)]
pub struct Fetched {
    pub records: u64,
    pub rows: Vec<Row>,
}

/// Issues the count and the page fetch against a store. Both reads run
/// concurrently and see the same predicate; they are not a snapshot, so
/// under concurrent writes `records` and `rows` may disagree slightly.
pub struct Executor<'a> {
    store: &'a dyn Store,
    settings: ExecutorSettings,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a dyn Store, settings: ExecutorSettings) -> Self {
        Self { store, settings }
    }

    pub async fn run(
        &self,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        sort: &ResolvedSort,
        window: PageWindow,
    ) -> Result<Fetched, StoreError> {
        let started = Instant::now();
        let reads = async {
            futures::try_join!(
                self.store.count(schema, predicate),
                self.store.fetch(schema, predicate, sort, window)
            )
        };
        let (records, rows) = self.bounded(reads).await?;
        self.warn_if_slow(schema, predicate, started.elapsed());
        Ok(Fetched { records, rows })
    }

    /// Single fetch for record lookups
    pub async fn fetch(
        &self,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        sort: &ResolvedSort,
        window: PageWindow,
    ) -> Result<Vec<Row>, StoreError> {
        let started = Instant::now();
        let rows = self.bounded(self.store.fetch(schema, predicate, sort, window)).await?;
        self.warn_if_slow(schema, predicate, started.elapsed());
        Ok(rows)
    }

    /// Dropping the timed-out future abandons every read still in flight
    async fn bounded<T, F>(&self, reads: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        match self.settings.query_timeout {
            Some(limit) => tokio::time::timeout(limit, reads)
                .await
                .map_err(|_| StoreError::Timeout(limit.as_millis() as u64))?,
            None => reads.await,
        }
    }

    fn warn_if_slow(&self, schema: &EntitySchema, predicate: &PredicateNode, elapsed: Duration) {
        if let Some(threshold) = self.settings.slow_query_threshold {
            if elapsed >= threshold {
                tracing::warn!(
                    entity = %schema.name,
                    store = self.store.name(),
                    predicate = %predicate.shape(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "slow search query"
                );
            }
        }
    }
}
