pub mod app;
pub mod calendar;
pub mod charts;
pub mod config;
pub mod contributions;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;

pub use app::router;
pub use charts::build_chart_data;
pub use config::Config;
pub use contributions::build_contribution_data;
pub use errors::{AppError, ErrorKind, TaskError};
pub use state::AppState;
pub use stats::{build_stats, format_duration};
pub use storage::{load_tasks, persist_tasks};
pub use store::{StoreSnapshot, TaskStore};
