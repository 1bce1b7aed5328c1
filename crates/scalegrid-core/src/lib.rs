//! scalegrid-core: the uniform scaler contract.
//!
//! Every backend (time-series forecasts, object stores, queues) reduces its
//! signal to one integer metric plus an activity flag behind the [`Scaler`]
//! trait, so the scheduler polling triggers never sees backend types.
//!
//! # Lifecycle
//!
//! ```text
//! ScalerConfig ──parse──► Metadata ──connect──► Scaler (Ready)
//!                                                  │  is_active / get_metrics (repeated)
//!                                                  ▼
//!                                               close() ──► Closed
//! ```
//!
//! Construction fails fast on bad metadata or an unreachable backend.
//! Per-call failures are returned to the caller and never retried here.

pub mod config;
pub mod context;
pub mod duration;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod metric;
pub mod scaler;

pub use config::{ScalerConfig, Secret};
pub use context::Context;
pub use duration::{DurationError, parse_duration};
pub use engine::EngineConfig;
pub use error::{BoxError, ScalerError, ScalerResult};
pub use lifecycle::{ConnectionState, Lifecycle};
pub use metric::{
    MetricSpec, MetricTarget, MetricTargetType, MetricValue, Observation, metric_name_with_index,
    metric_target, normalize_string,
};
pub use scaler::{Activity, Scaler};
