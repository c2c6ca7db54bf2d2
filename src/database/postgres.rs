use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Row as _};

use super::{Row, Store, StoreError};
use crate::filter::{FilterOrder, PageWindow, PredicateNode, ResolvedSort, Scalar};
use crate::schema::{EntitySchema, FieldKind};

/// Rendered statement plus positional parameters (`$1`, `$2`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Scalar>,
}

/// Renders a predicate tree into a Postgres WHERE clause. Identifiers come
/// from the validated entity table and are quoted; every value is a parameter.
pub struct SqlWriter<'a> {
    schema: &'a EntitySchema,
    params: Vec<Scalar>,
}

impl<'a> SqlWriter<'a> {
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self { schema, params: Vec::new() }
    }

    pub fn count(schema: &EntitySchema, predicate: &PredicateNode) -> SqlResult {
        let mut writer = SqlWriter::new(schema);
        let where_clause = writer.predicate(predicate);
        SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM {} WHERE {}",
                quote_identifier(&schema.table),
                where_clause
            ),
            params: writer.params,
        }
    }

    /// Rows come back as one JSON object each so the mapper sees the same
    /// shape regardless of store.
    pub fn select(schema: &EntitySchema, predicate: &PredicateNode, sort: &ResolvedSort, window: PageWindow) -> SqlResult {
        let mut writer = SqlWriter::new(schema);
        let where_clause = writer.predicate(predicate);
        let limit = writer.param(Scalar::Integer(clamp_i64(window.limit)));
        let offset = writer.param(Scalar::Integer(clamp_i64(window.offset)));
        SqlResult {
            query: format!(
                "SELECT row_to_json(t) AS row FROM {} t WHERE {} {} LIMIT {} OFFSET {}",
                quote_identifier(&schema.table),
                where_clause,
                FilterOrder::generate(schema, sort),
                limit,
                offset
            ),
            params: writer.params,
        }
    }

    pub fn predicate(&mut self, node: &PredicateNode) -> String {
        match node {
            PredicateNode::And(children) if children.is_empty() => "TRUE".to_string(),
            PredicateNode::And(children) => {
                let parts: Vec<String> = children.iter().map(|c| self.predicate(c)).collect();
                format!("({})", parts.join(" AND "))
            }
            PredicateNode::Equals { field, value } if value.is_null() => {
                format!("{} IS NULL", quote_identifier(field))
            }
            PredicateNode::Equals { field, value } => {
                let column = self.column(field);
                let p = self.param(value.clone());
                format!("{} = {}", column, p)
            }
            PredicateNode::Contains { field, needle, case_insensitive } => {
                let column = quote_identifier(field);
                let p = self.param(Scalar::Text(format!("%{}%", escape_like(needle))));
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                format!("{} {} {} ESCAPE '\\'", column, op, p)
            }
            PredicateNode::Range { field, lower, upper } => {
                let column = self.column(field);
                let mut parts = Vec::new();
                if let Some(lower) = lower {
                    let p = self.param(lower.clone());
                    parts.push(format!("{} >= {}", column, p));
                }
                if let Some(upper) = upper {
                    let p = self.param(upper.clone());
                    parts.push(format!("{} <= {}", column, p));
                }
                match parts.len() {
                    0 => "TRUE".to_string(),
                    1 => parts.remove(0),
                    _ => format!("({})", parts.join(" AND ")),
                }
            }
            PredicateNode::In { values, .. } if values.is_empty() => "FALSE".to_string(),
            PredicateNode::In { field, values } => {
                let column = self.column(field);
                let placeholders: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                format!("{} IN ({})", column, placeholders.join(", "))
            }
        }
    }

    /// Enum columns may be Postgres enum types; compare them as text
    fn column(&self, field: &str) -> String {
        match self.schema.kind_of(field) {
            Some(FieldKind::Enum(_)) => format!("{}::text", quote_identifier(field)),
            _ => quote_identifier(field),
        }
    }

    fn param(&mut self, value: Scalar) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn bind_scalar<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &Scalar,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        Scalar::Null => q.bind(Option::<String>::None),
        Scalar::Text(s) => q.bind(s.clone()),
        Scalar::Integer(i) => q.bind(*i),
        Scalar::Float(f) => q.bind(*f),
        Scalar::Bool(b) => q.bind(*b),
        Scalar::Uuid(u) => q.bind(*u),
        Scalar::Timestamp(ts) => q.bind(*ts),
    }
}

/// `Store` backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn count(&self, schema: &EntitySchema, predicate: &PredicateNode) -> Result<u64, StoreError> {
        let sql = SqlWriter::count(schema, predicate);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_scalar(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn fetch(
        &self,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        sort: &ResolvedSort,
        window: PageWindow,
    ) -> Result<Vec<Row>, StoreError> {
        let sql = SqlWriter::select(schema, predicate, sort, window);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_scalar(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row")?;
                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(StoreError::Decode(format!("expected a JSON object, got {}", other))),
                }
            })
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOrder, SortRequest};
    use crate::schema::{CaseRule, FieldDef};
    use uuid::Uuid;

    fn schema() -> EntitySchema {
        EntitySchema::builder("job_postings")
            .field(FieldDef::id("id"))
            .field(FieldDef::id("tenant_id"))
            .field(FieldDef::text("title", CaseRule::Insensitive).sortable())
            .field(FieldDef::enumeration("state", &["draft", "open", "closed"]))
            .field(FieldDef::integer("salary_min"))
            .field(FieldDef::timestamp("created_at").sortable())
            .tenant_scope("tenant_id")
            .build()
            .unwrap()
    }

    #[test]
    fn renders_count_with_parameters() {
        let tenant = Uuid::new_v4();
        let node = PredicateNode::And(vec![
            PredicateNode::equals("tenant_id", Scalar::Uuid(tenant)),
            PredicateNode::equals("deleted_at", Scalar::Null),
            PredicateNode::Contains { field: "title".into(), needle: "50%_off".into(), case_insensitive: true },
            PredicateNode::In {
                field: "state".into(),
                values: vec![Scalar::Text("open".into()), Scalar::Text("draft".into())],
            },
            PredicateNode::Range { field: "salary_min".into(), lower: Some(Scalar::Integer(10)), upper: None },
        ]);
        let sql = SqlWriter::count(&schema(), &node);
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"job_postings\" WHERE (\"tenant_id\" = $1 AND \"deleted_at\" IS NULL \
             AND \"title\" ILIKE $2 ESCAPE '\\' AND \"state\"::text IN ($3, $4) AND \"salary_min\" >= $5)"
        );
        assert_eq!(sql.params[0], Scalar::Uuid(tenant));
        assert_eq!(sql.params[1], Scalar::Text("%50\\%\\_off%".into()));
        assert_eq!(sql.params.len(), 5);
    }

    #[test]
    fn renders_select_with_order_and_window() {
        let sort = FilterOrder::resolve(
            &schema(),
            Some(&SortRequest { field: "title".into(), direction: Some("asc".into()) }),
        );
        let window = PageWindow { page: 3, limit: 10, offset: 20 };
        let sql = SqlWriter::select(&schema(), &PredicateNode::And(vec![]), &sort, window);
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM \"job_postings\" t WHERE TRUE \
             ORDER BY \"title\" ASC NULLS LAST, \"created_at\" ASC NULLS LAST, \"id\" ASC NULLS LAST \
             LIMIT $1 OFFSET $2"
        );
        assert_eq!(sql.params, vec![Scalar::Integer(10), Scalar::Integer(20)]);
    }

    #[test]
    fn empty_set_matches_nothing() {
        let schema = schema();
        let mut writer = SqlWriter::new(&schema);
        let node = PredicateNode::In { field: "state".into(), values: vec![] };
        assert_eq!(writer.predicate(&node), "FALSE");
        assert!(writer.params.is_empty());
    }

    #[test]
    fn bounded_range_uses_both_operators() {
        let schema = schema();
        let mut writer = SqlWriter::new(&schema);
        let node = PredicateNode::Range {
            field: "salary_min".into(),
            lower: Some(Scalar::Integer(1)),
            upper: Some(Scalar::Integer(9)),
        };
        assert_eq!(writer.predicate(&node), "(\"salary_min\" >= $1 AND \"salary_min\" <= $2)");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("tags"), "\"tags\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn huge_offsets_are_clamped() {
        assert_eq!(clamp_i64(u64::MAX), i64::MAX);
        assert_eq!(clamp_i64(40), 40);
    }
}
