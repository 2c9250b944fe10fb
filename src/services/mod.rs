//! Application services built on the adapters.

pub mod dispatcher;
pub mod retention_sweeper;
pub mod system_prompt;

pub use dispatcher::{
    DatabaseStats, Dispatcher, DispatcherSettings, HealthReport, PerformanceSnapshot,
    StartupReport,
};
pub use retention_sweeper::{RetentionSweeper, DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS};
pub use system_prompt::{render_full_prompt, render_system_prompt};
