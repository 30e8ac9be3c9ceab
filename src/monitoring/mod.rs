pub mod plots;
pub mod report;

pub use plots::plot_all;
pub use report::{report_timestamp, save_raw_metrics, save_report, summarize, write_report};
