use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use super::executor::{Executor, ExecutorSettings};
use super::mapper::RowMapper;
use crate::config::AppConfig;
use crate::database::{Store, StoreError};
use crate::filter::{
    normalize, FieldErrors, FilterOrder, FilterValue, FilterWhere, Page, PageWindow, Pager, PredicateNode,
    ResolvedSort, SearchError, SearchRequest, SearchResult,
};
use crate::schema::EntitySchema;
use crate::scope::{Principal, ScopeGrant, ScopePolicy};

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchSettings {
    /// Deployment-wide ceiling on top of each entity's own max limit
    pub max_limit: Option<u64>,
    pub debug_logging: bool,
    pub executor: ExecutorSettings,
}

impl SearchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let db = &config.database;
        Self {
            max_limit: config.search.max_limit,
            debug_logging: config.search.debug_logging,
            executor: ExecutorSettings {
                query_timeout: (db.query_timeout_ms > 0).then(|| Duration::from_millis(db.query_timeout_ms)),
                slow_query_threshold: db
                    .enable_slow_query_warning
                    .then(|| Duration::from_millis(db.slow_query_threshold_ms)),
            },
        }
    }
}

/// Everything decided before the store is touched
#[derive(Debug, Clone)]
pub struct SearchPlan {
    pub grant: ScopeGrant,
    pub predicate: PredicateNode,
    pub sort: ResolvedSort,
    pub window: PageWindow,
    /// Caller filter keys dropped because they target a scope column
    pub discarded: Vec<String>,
}

/// Scoped search over any registered entity
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn Store>,
    policy: Arc<ScopePolicy>,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            policy: Arc::new(ScopePolicy::default()),
            settings: SearchSettings::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScopePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// Scope check, normalization, sort resolution, paging and predicate
    /// building. Pure: any error here means no query is issued.
    pub fn plan(&self, principal: &Principal, schema: &EntitySchema, request: &SearchRequest) -> SearchResult<SearchPlan> {
        let grant = self.policy.enforce(principal, schema)?;

        let mut filters = request.filters.clone();
        let discarded = grant.strip_overrides(&mut filters);
        if !discarded.is_empty() {
            tracing::debug!(
                entity = %schema.name,
                principal = %principal.id,
                keys = ?discarded,
                "ignoring caller filters on scope columns"
            );
        }

        let mut errors = FieldErrors::new();
        let page = collect(&mut errors, Pager::parse_integer("page", request.page.as_ref()));
        let limit = collect(&mut errors, Pager::parse_integer("limit", request.limit.as_ref()));
        let normalized = match normalize(schema, &filters) {
            Ok(normalized) => normalized,
            Err(SearchError::Validation(field_errors)) => {
                errors.extend(field_errors);
                Default::default()
            }
            Err(other) => return Err(other),
        };
        if !errors.is_empty() {
            return Err(SearchError::Validation(errors));
        }

        let window = Pager::window(page.flatten(), limit.flatten(), schema.limits, self.settings.max_limit);
        let sort = FilterOrder::resolve(schema, request.sort_request().as_ref());
        let predicate = FilterWhere::build(schema, &normalized, &grant);

        Ok(SearchPlan { grant, predicate, sort, window, discarded })
    }

    pub async fn search(
        &self,
        principal: &Principal,
        schema: &EntitySchema,
        request: &SearchRequest,
    ) -> SearchResult<Page<Value>> {
        let plan = self.plan(principal, schema, request)?;

        if self.settings.debug_logging {
            tracing::debug!(
                entity = %schema.name,
                predicate = %plan.predicate.shape(),
                sort = %plan.sort,
                offset = plan.window.offset,
                limit = plan.window.limit,
                "executing search"
            );
        }

        let fetched = self
            .executor()
            .run(schema, &plan.predicate, &plan.sort, plan.window)
            .await
            .map_err(|err| self.storage_failure(principal, schema, &plan.predicate, err))?;

        let data = RowMapper::map_all(schema, fetched.rows)
            .map_err(|err| self.storage_failure(principal, schema, &plan.predicate, err))?;

        Ok(Page::assemble(plan.window, fetched.records, data))
    }

    /// Scoped lookup of one record. A record outside the caller's scope is
    /// indistinguishable from one that does not exist.
    pub async fn find_one(&self, principal: &Principal, schema: &EntitySchema, id: &str) -> SearchResult<Value> {
        let grant = self.policy.enforce(principal, schema)?;

        let mut key = Map::new();
        key.insert(schema.id_field.clone(), Value::String(id.to_string()));
        let mut normalized = normalize(schema, &key)?;
        let Some(FilterValue::Exact(id_value)) = normalized.remove(&schema.id_field) else {
            return Err(SearchError::NotFound(schema.name.clone()));
        };

        let mut predicate = FilterWhere::mandatory(schema, &grant);
        if let PredicateNode::And(children) = &mut predicate {
            children.push(PredicateNode::equals(schema.id_field.clone(), id_value));
        }

        let sort = FilterOrder::resolve(schema, None);
        let window = PageWindow { page: 1, limit: 1, offset: 0 };
        let rows = self
            .executor()
            .fetch(schema, &predicate, &sort, window)
            .await
            .map_err(|err| self.storage_failure(principal, schema, &predicate, err))?;

        match rows.into_iter().next() {
            Some(row) => RowMapper::map(schema, row).map_err(|err| self.storage_failure(principal, schema, &predicate, err)),
            None => Err(SearchError::NotFound(schema.name.clone())),
        }
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(self.store.as_ref(), self.settings.executor)
    }

    /// Logged with the predicate shape only; filter values may be sensitive
    fn storage_failure(
        &self,
        principal: &Principal,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        err: StoreError,
    ) -> SearchError {
        tracing::error!(
            entity = %schema.name,
            store = self.store.name(),
            predicate = %predicate.shape(),
            principal = %principal.id,
            error = %err,
            "search storage failure"
        );
        SearchError::Storage(err)
    }
}

fn collect<T>(errors: &mut FieldErrors, result: SearchResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(SearchError::Validation(field_errors)) => {
            errors.extend(field_errors);
            None
        }
        Err(_) => None,
    }
}
