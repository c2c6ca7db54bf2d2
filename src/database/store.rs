use async_trait::async_trait;

use super::{Row, StoreError};
use crate::filter::{PageWindow, PredicateNode, ResolvedSort};
use crate::schema::EntitySchema;

/// Read-only repository the search executor talks to.
///
/// Implementations receive a fully built predicate tree and a resolved sort;
/// they never see raw caller input. `count` and `fetch` must interpret the
/// predicate identically.
#[async_trait]
pub trait Store: Send + Sync {
    fn name(&self) -> &'static str;

    async fn count(&self, schema: &EntitySchema, predicate: &PredicateNode) -> Result<u64, StoreError>;

    async fn fetch(
        &self,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        sort: &ResolvedSort,
        window: PageWindow,
    ) -> Result<Vec<Row>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
