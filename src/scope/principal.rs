use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles recognized by the scope policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    TenantAdmin,
    OrgAdmin,
    Member,
    Applicant,
    Anonymous,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::OrgAdmin => "org_admin",
            Role::Member => "member",
            Role::Applicant => "applicant",
            Role::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "system_admin" | "root" => Ok(Role::SystemAdmin),
            "tenant_admin" | "full" => Ok(Role::TenantAdmin),
            "org_admin" => Ok(Role::OrgAdmin),
            "member" | "user" | "edit" | "read" => Ok(Role::Member),
            "applicant" => Ok(Role::Applicant),
            "anonymous" => Ok(Role::Anonymous),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The identity a search runs as. Built by the auth boundary, immutable for
/// the lifetime of one request, never persisted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub is_authenticated: bool,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            tenant_id: None,
            organization_id: None,
            is_authenticated: true,
        }
    }

    /// Explicit marker for a request that carried no credentials
    pub fn anonymous() -> Self {
        Self {
            id: Uuid::nil(),
            role: Role::Anonymous,
            tenant_id: None,
            organization_id: None,
            is_authenticated: false,
        }
    }

    pub fn in_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn in_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}
