// handlers/mod.rs - handler tiers
//
// Public (no principal) → Protected (principal resolved by middleware; the
// scope policy decides what an anonymous principal may see)
pub mod protected;
pub mod public;
