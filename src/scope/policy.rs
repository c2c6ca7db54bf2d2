use std::collections::HashMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::principal::{Principal, Role};
use crate::filter::error::{SearchError, SearchResult};
use crate::filter::types::{PredicateNode, Scalar};
use crate::schema::EntitySchema;

/// One scoping dimension a rule can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeClaim {
    Tenant,
    Organization,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeRule {
    /// No mandatory predicate
    Unrestricted,
    /// Conjunction of the listed claims. An entity without a column for one
    /// of them is denied; widening takes an explicit entity override.
    Scoped(Vec<ScopeClaim>),
    Deny,
}

static DENY: ScopeRule = ScopeRule::Deny;

/// Central role → rule table shared by every search and lookup
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    rules: HashMap<Role, ScopeRule>,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        use ScopeClaim::*;

        let mut rules = HashMap::new();
        rules.insert(Role::SystemAdmin, ScopeRule::Unrestricted);
        rules.insert(Role::TenantAdmin, ScopeRule::Scoped(vec![Tenant]));
        rules.insert(Role::OrgAdmin, ScopeRule::Scoped(vec![Tenant, Organization]));
        rules.insert(Role::Member, ScopeRule::Scoped(vec![Tenant, Owner]));
        rules.insert(Role::Applicant, ScopeRule::Scoped(vec![Owner]));
        rules.insert(Role::Anonymous, ScopeRule::Deny);
        Self { rules }
    }
}

impl ScopePolicy {
    pub fn with_rule(mut self, role: Role, rule: ScopeRule) -> Self {
        self.rules.insert(role, rule);
        self
    }

    /// Entity overrides first, then the shared table; unlisted roles are denied
    pub fn rule_for<'a>(&'a self, role: Role, schema: &'a EntitySchema) -> &'a ScopeRule {
        schema
            .policy_overrides
            .get(&role)
            .or_else(|| self.rules.get(&role))
            .unwrap_or(&DENY)
    }

    /// Derive the mandatory predicates for `principal` on `schema`, or refuse
    /// the operation outright. Runs before any storage access.
    pub fn enforce(&self, principal: &Principal, schema: &EntitySchema) -> SearchResult<ScopeGrant> {
        if schema.requires_auth && !principal.is_authenticated {
            return Err(SearchError::forbidden(format!(
                "authentication required to access {}",
                schema.name
            )));
        }

        let role = if principal.is_authenticated { principal.role } else { Role::Anonymous };

        let claims = match self.rule_for(role, schema) {
            ScopeRule::Unrestricted => return Ok(ScopeGrant::unrestricted()),
            ScopeRule::Deny => {
                return Err(SearchError::forbidden(format!(
                    "role {} may not access {}",
                    role, schema.name
                )))
            }
            ScopeRule::Scoped(claims) => claims,
        };

        let mut grant = ScopeGrant::unrestricted();
        for claim in claims {
            let column = match claim {
                ScopeClaim::Tenant => &schema.scope.tenant,
                ScopeClaim::Organization => &schema.scope.organization,
                ScopeClaim::Owner => &schema.scope.owner,
            };
            let column = column.as_deref().ok_or_else(|| {
                SearchError::forbidden(format!(
                    "{} has no {} column required for role {}",
                    schema.name,
                    claim_name(*claim),
                    role
                ))
            })?;

            let value = claim_value(principal, *claim).ok_or_else(|| {
                SearchError::forbidden(format!(
                    "principal carries no {} identifier required by {}",
                    claim_name(*claim),
                    schema.name
                ))
            })?;
            grant.require(column, value);
        }

        if grant.is_unrestricted() {
            return Err(SearchError::forbidden(format!(
                "no scope of role {} applies to {}",
                role, schema.name
            )));
        }
        Ok(grant)
    }
}

fn claim_value(principal: &Principal, claim: ScopeClaim) -> Option<Uuid> {
    match claim {
        ScopeClaim::Tenant => principal.tenant_id,
        ScopeClaim::Organization => principal.organization_id,
        ScopeClaim::Owner => principal.is_authenticated.then_some(principal.id),
    }
}

fn claim_name(claim: ScopeClaim) -> &'static str {
    match claim {
        ScopeClaim::Tenant => "tenant",
        ScopeClaim::Organization => "organization",
        ScopeClaim::Owner => "owner",
    }
}

/// Result of a permitted scope check: the predicates every query must carry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeGrant {
    assignments: Vec<(String, Scalar)>,
}

impl ScopeGrant {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    fn require(&mut self, column: &str, value: Uuid) {
        self.assignments.push((column.to_string(), Scalar::Uuid(value)));
    }

    pub fn is_unrestricted(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn predicates(&self) -> Vec<PredicateNode> {
        self.assignments
            .iter()
            .map(|(field, value)| PredicateNode::equals(field.clone(), value.clone()))
            .collect()
    }

    pub fn is_mandatory(&self, field: &str) -> bool {
        self.assignments.iter().any(|(f, _)| f == field)
    }

    /// Field/value pairs a create handler must stamp on new rows
    pub fn assignments(&self) -> &[(String, Scalar)] {
        &self.assignments
    }

    /// Remove caller filters that target a scope column (including its
    /// `_from`/`_to` forms). Returns the removed keys.
    pub fn strip_overrides(&self, filters: &mut Map<String, Value>) -> Vec<String> {
        let colliding: Vec<String> = filters
            .keys()
            .filter(|key| {
                let base = key
                    .strip_suffix("_from")
                    .or_else(|| key.strip_suffix("_to"))
                    .unwrap_or(key.as_str());
                self.is_mandatory(key) || self.is_mandatory(base)
            })
            .cloned()
            .collect();
        for key in &colliding {
            filters.remove(key);
        }
        colliding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CaseRule, FieldDef};
    use serde_json::json;

    fn schema() -> EntitySchema {
        EntitySchema::builder("reminders")
            .field(FieldDef::id("id"))
            .field(FieldDef::id("tenant_id"))
            .field(FieldDef::id("organization_id"))
            .field(FieldDef::id("owner_id"))
            .field(FieldDef::text("title", CaseRule::Insensitive))
            .field(FieldDef::timestamp("created_at").sortable())
            .tenant_scope("tenant_id")
            .organization_scope("organization_id")
            .owner_scope("owner_id")
            .build()
            .unwrap()
    }

    fn tenant_only() -> EntitySchema {
        EntitySchema::builder("tags")
            .field(FieldDef::id("id"))
            .field(FieldDef::id("tenant_id"))
            .field(FieldDef::timestamp("created_at").sortable())
            .tenant_scope("tenant_id")
            .build()
            .unwrap()
    }

    #[test]
    fn system_admin_is_unrestricted() {
        let p = Principal::new(Uuid::new_v4(), Role::SystemAdmin);
        let grant = ScopePolicy::default().enforce(&p, &schema()).unwrap();
        assert!(grant.is_unrestricted());
        assert!(grant.predicates().is_empty());
    }

    #[test]
    fn org_admin_gets_tenant_and_organization() {
        let tenant = Uuid::new_v4();
        let org = Uuid::new_v4();
        let p = Principal::new(Uuid::new_v4(), Role::OrgAdmin)
            .in_tenant(tenant)
            .in_organization(org);
        let grant = ScopePolicy::default().enforce(&p, &schema()).unwrap();
        assert_eq!(
            grant.predicates(),
            vec![
                PredicateNode::equals("tenant_id", Scalar::Uuid(tenant)),
                PredicateNode::equals("organization_id", Scalar::Uuid(org)),
            ]
        );
    }

    #[test]
    fn member_is_tenant_and_owner_scoped() {
        let tenant = Uuid::new_v4();
        let id = Uuid::new_v4();
        let p = Principal::new(id, Role::Member).in_tenant(tenant);

        let grant = ScopePolicy::default().enforce(&p, &schema()).unwrap();
        assert!(grant.is_mandatory("owner_id"));
        assert!(grant.is_mandatory("tenant_id"));
    }

    #[test]
    fn missing_scope_column_fails_closed() {
        let tenant = Uuid::new_v4();

        // No owner column must not widen a member to the whole tenant
        let member = Principal::new(Uuid::new_v4(), Role::Member).in_tenant(tenant);
        let err = ScopePolicy::default().enforce(&member, &tenant_only()).unwrap_err();
        assert!(err.is_forbidden());

        let org_admin = Principal::new(Uuid::new_v4(), Role::OrgAdmin)
            .in_tenant(tenant)
            .in_organization(Uuid::new_v4());
        let err = ScopePolicy::default().enforce(&org_admin, &tenant_only()).unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn entity_override_can_widen_explicitly() {
        let tenant = Uuid::new_v4();
        let schema = EntitySchema::builder("tags")
            .field(FieldDef::id("id"))
            .field(FieldDef::id("tenant_id"))
            .field(FieldDef::timestamp("created_at").sortable())
            .tenant_scope("tenant_id")
            .override_role(Role::Member, ScopeRule::Scoped(vec![ScopeClaim::Tenant]))
            .build()
            .unwrap();
        let p = Principal::new(Uuid::new_v4(), Role::Member).in_tenant(tenant);
        let grant = ScopePolicy::default().enforce(&p, &schema).unwrap();
        assert_eq!(grant.assignments(), &[("tenant_id".to_string(), Scalar::Uuid(tenant))]);
    }

    #[test]
    fn missing_identifier_fails_closed() {
        let p = Principal::new(Uuid::new_v4(), Role::TenantAdmin);
        let err = ScopePolicy::default().enforce(&p, &schema()).unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn no_applicable_claim_is_denied() {
        let p = Principal::new(Uuid::new_v4(), Role::Applicant);
        let err = ScopePolicy::default().enforce(&p, &tenant_only()).unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn unauthenticated_is_denied_on_protected_entity() {
        let err = ScopePolicy::default()
            .enforce(&Principal::anonymous(), &schema())
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn entity_override_wins() {
        let schema = EntitySchema::builder("recipes")
            .field(FieldDef::id("id"))
            .field(FieldDef::timestamp("created_at").sortable())
            .public()
            .override_role(Role::Anonymous, ScopeRule::Unrestricted)
            .build()
            .unwrap();
        let grant = ScopePolicy::default().enforce(&Principal::anonymous(), &schema).unwrap();
        assert!(grant.is_unrestricted());
    }

    #[test]
    fn strips_filters_that_target_scope_columns() {
        let tenant = Uuid::new_v4();
        let p = Principal::new(Uuid::new_v4(), Role::TenantAdmin).in_tenant(tenant);
        let grant = ScopePolicy::default().enforce(&p, &tenant_only()).unwrap();

        let mut filters = json!({
            "tenant_id": Uuid::new_v4().to_string(),
            "tenant_id_from": "x",
            "name": "keep"
        })
        .as_object()
        .cloned()
        .unwrap();
        let mut stripped = grant.strip_overrides(&mut filters);
        stripped.sort();
        assert_eq!(stripped, vec!["tenant_id", "tenant_id_from"]);
        assert_eq!(filters.len(), 1);
        assert!(filters.contains_key("name"));
    }
}
