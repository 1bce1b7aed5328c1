//! Predictive scaler: Prometheus history in, forecasting engine out.
//!
//! [`PredictiveScaler`] pulls a window of samples for the trigger's query,
//! flattens them into [`scalegrid_core::Observation`]s and asks the remote
//! engine (gRPC, `services.MlEngineService`) how much demand to expect
//! `predictHorizon` from now.

pub mod engine;
pub mod metadata;
pub mod normalize;
pub mod prometheus;
pub mod proto;
pub mod scaler;

pub use engine::{EngineClient, Forecaster};
pub use metadata::{PredictiveMetadata, PrometheusAuth, PrometheusTls};
pub use prometheus::{PrometheusClient, QueryRange, QueryResult, RangeQuerier};
pub use scaler::{KIND, PredictiveScaler};
