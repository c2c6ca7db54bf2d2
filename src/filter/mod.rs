pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod normalize;
pub mod page;
pub mod pager;
pub mod types;

pub use error::{FieldErrors, SearchError, SearchResult};
pub use filter_order::FilterOrder;
pub use filter_where::FilterWhere;
pub use normalize::normalize;
pub use page::{Page, Pagination};
pub use pager::{PageWindow, Pager};
pub use types::*;
