pub mod database;
pub mod ledger;
pub mod metrics;
pub mod render;
pub mod schedule;
pub mod slots;
pub mod tokens;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
