pub mod policy;
pub mod principal;

pub use policy::{ScopeClaim, ScopeGrant, ScopePolicy, ScopeRule};
pub use principal::{Principal, Role};
