// handlers/protected/mod.rs - scoped search endpoints
//
// Every handler here receives a `Principal` extension from
// `middleware::principal_middleware` and passes it to the search engine.
pub mod data;
pub mod find;
