#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use scoped_search::app::{self, AppState};
use scoped_search::auth::{Claims, JwtKeys};
use scoped_search::database::{MemoryStore, Row, Store, StoreError};
use scoped_search::filter::{PageWindow, PredicateNode, ResolvedSort};
use scoped_search::schema::{EntityRegistry, EntitySchema};
use scoped_search::scope::Role;
use scoped_search::search::SearchEngine;

pub const SECRET: &str = "integration-test-secret";

pub fn tenant_a() -> Uuid {
    Uuid::from_u128(0xA000)
}

pub fn tenant_b() -> Uuid {
    Uuid::from_u128(0xB000)
}

pub fn user(n: u128) -> Uuid {
    Uuid::from_u128(0x1000 + n)
}

pub fn record_id(n: u128) -> Uuid {
    Uuid::from_u128(0xF000_0000 + n)
}

/// Memory store that counts every storage call
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn count(&self, schema: &EntitySchema, predicate: &PredicateNode) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count(schema, predicate).await
    }

    async fn fetch(
        &self,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        sort: &ResolvedSort,
        window: PageWindow,
    ) -> Result<Vec<Row>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(schema, predicate, sort, window).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<CountingStore>,
    keys: JwtKeys,
}

impl TestApp {
    pub fn new(store: MemoryStore) -> Self {
        let store = Arc::new(CountingStore::new(store));
        let engine = SearchEngine::new(store.clone());
        let registry = EntityRegistry::builtin().expect("built-in entities are valid");
        let keys = JwtKeys::new(SECRET);
        let router = app::router(AppState::new(engine, registry, keys.clone()));
        Self { router, store, keys }
    }

    /// Bearer token for a principal of `role` in `tenant`
    pub fn token(&self, role: Role, id: Uuid, tenant: Option<Uuid>) -> String {
        let mut claims = Claims::new(id, role, chrono::Duration::hours(1));
        if let Some(tenant) = tenant {
            claims = claims.in_tenant(tenant);
        }
        self.keys.generate(&claims).expect("token")
    }

    pub fn member(&self, id: Uuid, tenant: Uuid) -> String {
        self.token(Role::Member, id, Some(tenant))
    }

    pub fn org_admin(&self, id: Uuid, tenant: Uuid, organization: Uuid) -> String {
        let claims = Claims::new(id, Role::OrgAdmin, chrono::Duration::hours(1))
            .in_tenant(tenant)
            .in_organization(organization);
        self.keys.generate(&claims).expect("token")
    }

    pub fn admin(&self) -> String {
        self.token(Role::SystemAdmin, user(999), None)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, token, Body::empty()).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, token, Body::from(body.to_string())).await
    }

    pub async fn post_raw(&self, uri: &str, token: Option<&str>, body: &'static str) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, token, Body::from(body)).await
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Body) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(body).context("build request")?;

        let response = self.router.clone().oneshot(request).await.context("router call")?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.context("read body")?;
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {}", uri))?
        };
        Ok((status, payload))
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object row, got {}", other),
    }
}

pub fn tag(n: u128, tenant: Uuid, name: &str, usage: i64, created_at: &str) -> Row {
    row(json!({
        "id": record_id(n).to_string(),
        "tenant_id": tenant.to_string(),
        "created_by": user(1).to_string(),
        "name": name,
        "color": null,
        "usage_count": usage,
        "created_at": created_at,
        "updated_at": created_at,
    }))
}

/// Twelve tags: five live in tenant A, one soft-deleted in A, six in B
pub async fn seeded_tags() -> MemoryStore {
    let store = MemoryStore::new();
    let a = tenant_a();
    let b = tenant_b();

    store
        .insert_many(
            "tags",
            vec![
                tag(1, a, "urgent", 12, "2024-01-01T09:00:00Z"),
                tag(2, a, "billing", 3, "2024-01-02T09:00:00Z"),
                tag(3, a, "urgent-followup", 7, "2024-01-03T09:00:00Z"),
                tag(4, a, "archive", 0, "2024-01-04T09:00:00Z"),
                tag(5, a, "clinic", 25, "2024-01-05T09:00:00Z"),
                tag(6, b, "urgent", 40, "2024-01-01T10:00:00Z"),
                tag(7, b, "finance", 2, "2024-01-02T10:00:00Z"),
                tag(8, b, "hr", 9, "2024-01-03T10:00:00Z"),
                tag(9, b, "legal", 1, "2024-01-04T10:00:00Z"),
                tag(10, b, "ops", 5, "2024-01-05T10:00:00Z"),
                tag(11, b, "sales", 8, "2024-01-06T10:00:00Z"),
            ],
        )
        .await;

    let mut deleted = tag(12, a, "deleted-tag", 99, "2024-01-06T09:00:00Z");
    deleted.insert("deleted_at".to_string(), json!("2024-02-01T00:00:00Z"));
    store.insert("tags", deleted).await;

    store
}

pub fn reminder(n: u128, tenant: Uuid, owner: Uuid, title: &str, status: &str, due_at: Option<&str>) -> Row {
    row(json!({
        "id": record_id(100 + n).to_string(),
        "tenant_id": tenant.to_string(),
        "owner_id": owner.to_string(),
        "title": title,
        "notes": null,
        "status": status,
        "priority": "normal",
        "due_at": due_at,
        "created_at": format!("2024-03-{:02}T08:00:00Z", n),
    }))
}

/// Reminders for two members of tenant A and one member of tenant B
pub async fn seeded_reminders() -> MemoryStore {
    let store = MemoryStore::new();
    let a = tenant_a();

    store
        .insert_many(
            "reminders",
            vec![
                reminder(1, a, user(1), "Call pharmacy", "pending", Some("2024-04-01T12:00:00Z")),
                reminder(2, a, user(1), "Renew licence", "sent", None),
                reminder(3, a, user(1), "Book follow-up", "dismissed", Some("2024-03-15T12:00:00Z")),
                reminder(4, a, user(1), "Order supplies", "pending", Some("2024-05-20T12:00:00Z")),
                reminder(5, a, user(2), "Team lunch", "pending", Some("2024-04-02T12:00:00Z")),
                reminder(6, tenant_b(), user(3), "Quarterly review", "pending", None),
            ],
        )
        .await;

    store
}

pub fn ids(payload: &Value) -> Vec<String> {
    payload["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub fn names(payload: &Value, field: &str) -> Vec<String> {
    payload["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r[field].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
