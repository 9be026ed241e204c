pub mod analytics;
pub mod cache;
pub mod governor;
pub mod sink;
pub mod store;

pub use analytics::{tenant_cost_rollup, TenantCostRollup};
pub use cache::ResponseCache;
pub use governor::{Admission, BudgetGovernor};
pub use sink::CostSink;
pub use store::SharedStore;
