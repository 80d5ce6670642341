//! Allocation Engine
//!
//! Per-member, per-day workload derived from task estimates, plus the views
//! built on it: heatmap, overload alerts, summaries, portfolio health and a
//! watcher that keeps alerts current.

#![warn(missing_docs)]

pub mod calendar;
pub mod config;
pub mod engine;
pub mod heatmap;
pub mod report;
pub mod watcher;

pub use calendar::{is_weekend, week_of, week_start, BusinessCalendar};
pub use config::{ConfigError, EngineConfig};
pub use engine::{classify_workload, AllocationEngine};
pub use heatmap::{Heatmap, HeatmapRow};
pub use report::{EnrichedTask, MemberSummary, OverloadAlert, ProjectHealth};
pub use watcher::{OverloadReport, OverloadWatcher, WatchDate, DEFAULT_DATE_CHECK_INTERVAL};
