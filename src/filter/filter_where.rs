use super::types::{FilterValue, NormalizedFilters, PredicateNode, Scalar};
use crate::schema::{CaseRule, EntitySchema, FilterMode};
use crate::scope::ScopeGrant;

pub struct FilterWhere;

impl FilterWhere {
    /// Compose scope predicates, the soft-delete exclusion and the caller's
    /// filters into a single conjunction. Scope predicates come first and a
    /// caller filter on a scope column is dropped, never merged.
    pub fn build(schema: &EntitySchema, filters: &NormalizedFilters, grant: &ScopeGrant) -> PredicateNode {
        let mut children = grant.predicates();

        if let Some(column) = &schema.soft_delete {
            children.push(PredicateNode::equals(column.clone(), Scalar::Null));
        }

        for (field, value) in filters {
            if grant.is_mandatory(field) {
                tracing::debug!(entity = %schema.name, field = %field, "dropping caller filter on scope column");
                continue;
            }
            children.push(Self::field_predicate(schema, field, value));
        }

        PredicateNode::And(children)
    }

    /// Mandatory predicates only: scope plus soft-delete
    pub fn mandatory(schema: &EntitySchema, grant: &ScopeGrant) -> PredicateNode {
        Self::build(schema, &NormalizedFilters::new(), grant)
    }

    fn field_predicate(schema: &EntitySchema, field: &str, value: &FilterValue) -> PredicateNode {
        match value {
            FilterValue::Exact(scalar) => PredicateNode::equals(field, scalar.clone()),
            FilterValue::Contains(needle) => PredicateNode::Contains {
                field: field.to_string(),
                needle: needle.clone(),
                case_insensitive: Self::case_rule(schema, field) == CaseRule::Insensitive,
            },
            FilterValue::Range { lower, upper } => PredicateNode::Range {
                field: field.to_string(),
                lower: lower.clone(),
                upper: upper.clone(),
            },
            FilterValue::Set(values) => PredicateNode::In {
                field: field.to_string(),
                values: values.clone(),
            },
        }
    }

    fn case_rule(schema: &EntitySchema, field: &str) -> CaseRule {
        match schema.field(field).and_then(|f| f.filter) {
            Some(FilterMode::Contains(rule)) => rule,
            _ => CaseRule::Sensitive,
        }
    }
}
