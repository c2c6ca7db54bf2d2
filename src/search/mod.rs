//! Search orchestration: scope → normalize → sort → page → build → execute →
//! map → assemble.

pub mod engine;
pub mod executor;
pub mod mapper;

pub use engine::{SearchEngine, SearchPlan, SearchSettings};
pub use executor::{Executor, ExecutorSettings, Fetched};
pub use mapper::RowMapper;
