//! Per-culture vector retrieval: offline build, runtime store, routing and
//! exact top-k search.

pub mod build;
pub mod flat;
pub mod route;
pub mod search;
pub mod store;

pub use build::build_indices;
pub use flat::{FlatIpIndex, Hit};
pub use route::route_culture;
pub use search::search_top_k;
pub use store::{load_system, Partition, SystemContext};
