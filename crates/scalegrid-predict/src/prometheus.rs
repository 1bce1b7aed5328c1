//! Minimal Prometheus HTTP API client.
//!
//! Only the two endpoints the predictive scaler needs: `query_range` for
//! history and `status/runtimeinfo` as a reachability ping.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Certificate, ClientBuilder, Identity, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use scalegrid_core::{ScalerError, ScalerResult};

use crate::metadata::{PredictiveMetadata, PrometheusAuth, PrometheusTls};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Time window and resolution of a range query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

/// `[<unix seconds>, "<value>"]` as Prometheus encodes it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplePair(pub f64, pub String);

/// One element of an instant vector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstantSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: SamplePair,
}

/// One series of a range matrix.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

/// The four result shapes of the query API.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Vector(Vec<InstantSample>),
    Matrix(Vec<RangeSeries>),
    Scalar(SamplePair),
    String(SamplePair),
    /// A `resultType` this client does not know.
    Unknown(String),
}

impl QueryResult {
    fn decode(result_type: &str, result: serde_json::Value) -> ScalerResult<Self> {
        Ok(match result_type {
            "vector" => Self::Vector(from_value(result)?),
            "matrix" => Self::Matrix(from_value(result)?),
            "scalar" => Self::Scalar(from_value(result)?),
            "string" => Self::String(from_value(result)?),
            other => Self::Unknown(other.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

/// Source of historical samples for the predictive scaler.
#[async_trait]
pub trait RangeQuerier: Send + Sync {
    async fn query_range(&self, query: &str, range: &QueryRange) -> ScalerResult<QueryResult>;
}

/// HTTP client for one Prometheus server.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base: Url,
    http: reqwest::Client,
    auth: PrometheusAuth,
}

impl PrometheusClient {
    pub fn new(address: &str, auth: PrometheusAuth, unsafe_ssl: bool) -> ScalerResult<Self> {
        let base = Url::parse(address)
            .map_err(|e| ScalerError::config(format!("invalid prometheusAddress: {e}")))?;
        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(unsafe_ssl);
        if let Some(tls) = &auth.tls {
            builder = client_tls(builder, tls)?;
        }
        let http = builder
            .build()
            .map_err(|e| ScalerError::Connection(format!("init Prometheus client: {e}")))?;

        Ok(Self { base, http, auth })
    }

    pub fn from_metadata(meta: &PredictiveMetadata) -> ScalerResult<Self> {
        Self::new(
            &meta.prometheus_address,
            meta.prometheus_auth.clone(),
            meta.unsafe_ssl,
        )
    }

    /// Fetch runtime information. Used to verify the server is reachable
    /// and accepts our credentials.
    pub async fn runtime_info(&self) -> ScalerResult<serde_json::Value> {
        let url = self.endpoint("api/v1/status/runtimeinfo");
        self.send(self.http.get(url)).await
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}/{path}", url.path().trim_end_matches('/'));
        url.set_path(&joined);
        url
    }

    fn authorize(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.auth.bearer_token {
            req = req.bearer_auth(token.expose());
        }
        if let Some((user, password)) = &self.auth.basic {
            req = req.basic_auth(user, password.as_ref().map(|p| p.expose()));
        }
        if let Some((header, value)) = &self.auth.custom_header {
            req = req.header(header.as_str(), value.expose());
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ScalerResult<T> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| ScalerError::Query(format!("prometheus request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ScalerError::Query(format!("reading prometheus response: {e}")))?;

        let parsed: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            ScalerError::Query(format!("prometheus returned {status}: undecodable body: {e}"))
        })?;

        if !parsed.warnings.is_empty() {
            debug!(warnings = ?parsed.warnings, "prometheus query warnings");
        }

        if parsed.status != "success" {
            return Err(ScalerError::Query(format!(
                "prometheus returned {status}: {}: {}",
                parsed.error_type.as_deref().unwrap_or("unknown"),
                parsed.error.as_deref().unwrap_or("no error message"),
            )));
        }

        parsed
            .data
            .ok_or_else(|| ScalerError::Query("prometheus response has no data".to_string()))
    }
}

/// Present the client certificate and trust the extra CA, if any.
fn client_tls(mut builder: ClientBuilder, tls: &PrometheusTls) -> ScalerResult<ClientBuilder> {
    let pem = format!("{}\n{}", tls.cert.expose(), tls.key.expose());
    let identity = Identity::from_pem(pem.as_bytes())
        .map_err(|e| ScalerError::config(format!("invalid tls cert or key: {e}")))?;
    builder = builder.identity(identity);

    if let Some(ca) = &tls.ca {
        let ca = Certificate::from_pem(ca.expose().as_bytes())
            .map_err(|e| ScalerError::config(format!("invalid tls ca: {e}")))?;
        builder = builder.add_root_certificate(ca);
    }
    Ok(builder)
}

#[async_trait]
impl RangeQuerier for PrometheusClient {
    async fn query_range(&self, query: &str, range: &QueryRange) -> ScalerResult<QueryResult> {
        let mut url = self.endpoint("api/v1/query_range");
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("start", &unix_seconds(range.start))
            .append_pair("end", &unix_seconds(range.end))
            .append_pair("step", &format!("{}", range.step.as_secs_f64()));

        debug!(%query, start = %range.start, end = %range.end, step = ?range.step, "prometheus range query");

        let data: QueryData = self.send(self.http.get(url)).await?;
        QueryResult::decode(&data.result_type, data.result)
    }
}

fn unix_seconds(t: DateTime<Utc>) -> String {
    format!("{}.{:03}", t.timestamp(), t.timestamp_subsec_millis())
}

fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> ScalerResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ScalerError::Query(format!("malformed prometheus result: {e}")))
}
