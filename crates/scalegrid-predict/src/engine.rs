//! gRPC client for the remote forecasting engine.

use std::path::Path;

use async_trait::async_trait;
use tonic::codegen::InterceptedService;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tonic::{Request, Status};
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tracing::{debug, info};

use scalegrid_core::{EngineConfig, Observation, ScalerError, ScalerResult, Secret};

use crate::proto::ml_engine_service_client::MlEngineServiceClient;
use crate::proto::{Item, ReqGetPredictMetric};

/// Metadata key carrying the engine API key on every call.
pub const API_KEY_HEADER: &str = "x-api-key";

/// A remote model that turns history into a single forecast.
#[async_trait]
pub trait Forecaster: Send + Sync {
    /// Probe the engine. Any answer other than `SERVING` is an error.
    async fn health(&self) -> ScalerResult<()>;

    /// Forecast `horizon` steps ahead from `observations`.
    async fn predict(&self, horizon: u64, observations: &[Observation]) -> ScalerResult<i64>;
}

/// Attaches the API key to outgoing requests.
#[derive(Clone)]
pub struct ApiKeyInterceptor {
    value: MetadataValue<Ascii>,
}

impl ApiKeyInterceptor {
    pub fn new(api_key: &Secret) -> ScalerResult<Self> {
        let value = MetadataValue::try_from(api_key.expose())
            .map_err(|e| ScalerError::config(format!("invalid apiKey: {e}")))?;
        Ok(Self { value })
    }
}

impl Interceptor for ApiKeyInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        req.metadata_mut().insert(API_KEY_HEADER, self.value.clone());
        Ok(req)
    }
}

type AuthedChannel = InterceptedService<Channel, ApiKeyInterceptor>;

/// Connected engine client. Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct EngineClient {
    health: HealthClient<AuthedChannel>,
    predict: MlEngineServiceClient<AuthedChannel>,
}

impl EngineClient {
    /// Dial the engine and wait for the channel to come up.
    pub async fn connect(config: &EngineConfig, api_key: &Secret) -> ScalerResult<Self> {
        let interceptor = ApiKeyInterceptor::new(api_key)?;
        let endpoint = endpoint(config)?;

        info!(uri = %config.uri(), tls = !config.insecure, "connecting to forecasting engine");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ScalerError::Connection(format!("dial {}: {e}", config.uri())))?;
        debug!(uri = %config.uri(), "forecasting engine channel ready");

        let health = HealthClient::with_interceptor(channel.clone(), interceptor.clone());
        let predict = MlEngineServiceClient::with_interceptor(channel, interceptor)
            .max_decoding_message_size(config.max_message_size)
            .max_encoding_message_size(config.max_message_size);

        Ok(Self { health, predict })
    }
}

#[async_trait]
impl Forecaster for EngineClient {
    async fn health(&self) -> ScalerResult<()> {
        let mut client = self.health.clone();
        let resp = client
            .check(HealthCheckRequest {
                service: String::new(),
            })
            .await
            .map_err(|status| {
                ScalerError::DegradedHealth(format!(
                    "{}, code: {:?}",
                    status.message(),
                    status.code()
                ))
            })?
            .into_inner();

        match resp.status() {
            ServingStatus::Serving => Ok(()),
            ServingStatus::Unknown => Err(ScalerError::DegradedHealth(
                "empty health check response".to_string(),
            )),
            other => Err(ScalerError::DegradedHealth(format!(
                "engine reports {}",
                other.as_str_name()
            ))),
        }
    }

    async fn predict(&self, horizon: u64, observations: &[Observation]) -> ScalerResult<i64> {
        let req = ReqGetPredictMetric {
            forecast_horizon: horizon,
            observations: observations.iter().map(to_item).collect(),
        };
        debug!(horizon, observations = req.observations.len(), "requesting forecast");

        let mut client = self.predict.clone();
        let resp = client
            .get_predict_metric(req)
            .await
            .map_err(|status| ScalerError::Query(status.to_string()))?;
        Ok(resp.into_inner().result_metric)
    }
}

fn endpoint(config: &EngineConfig) -> ScalerResult<Endpoint> {
    let mut endpoint = Channel::from_shared(config.uri())
        .map_err(|e| ScalerError::config(format!("invalid engine address: {e}")))?
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .http2_keep_alive_interval(config.keepalive_interval)
        .keep_alive_timeout(config.keepalive_timeout)
        .keep_alive_while_idle(config.keepalive_while_idle);

    if !config.insecure {
        let mut tls = ClientTlsConfig::new()
            .domain_name(config.host.clone())
            .with_webpki_roots();
        if let Some(path) = &config.ca_file {
            tls = tls.ca_certificate(load_ca(path)?);
        }
        endpoint = endpoint
            .tls_config(tls)
            .map_err(|e| ScalerError::Connection(format!("engine tls config: {e}")))?;
    }

    Ok(endpoint)
}

/// Read a PEM bundle, refusing files without a single certificate.
pub fn load_ca(path: &Path) -> ScalerResult<Certificate> {
    let pem = std::fs::read(path)
        .map_err(|e| ScalerError::config(format!("reading ca_file {}: {e}", path.display())))?;

    let mut reader = pem.as_slice();
    let mut count = 0usize;
    for cert in rustls_pemfile::certs(&mut reader) {
        cert.map_err(|e| {
            ScalerError::config(format!("parsing ca_file {}: {e}", path.display()))
        })?;
        count += 1;
    }
    if count == 0 {
        return Err(ScalerError::config(format!(
            "no certificates found in ca_file {}",
            path.display()
        )));
    }

    Ok(Certificate::from_pem(pem))
}

fn to_item(obs: &Observation) -> Item {
    Item {
        timestamp: Some(prost_types::Timestamp {
            seconds: obs.timestamp.timestamp(),
            nanos: obs.timestamp.timestamp_subsec_nanos() as i32,
        }),
        value: obs.value,
        metric_name: obs.metric_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::SocketAddr;
    use std::time::Duration;

    use chrono::DateTime;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::Response;
    use tonic::service::Routes;
    use tonic::transport::Server;
    use tonic_health::pb::HealthCheckResponse;
    use tonic_health::pb::health_server::{Health, HealthServer};
    use tonic_health::server::HealthReporter;

    use crate::proto::ResGetPredictMetric;
    use crate::proto::ml_engine_service_server::{MlEngineService, MlEngineServiceServer};

    use super::*;

    const KEY: &str = "aaa.bbb.ccc";

    fn require_key(req: Request<()>) -> Result<Request<()>, Status> {
        match req.metadata().get(API_KEY_HEADER) {
            Some(v) if v == KEY => Ok(req),
            _ => Err(Status::unauthenticated("bad api key")),
        }
    }

    /// Health-only engine on an ephemeral port.
    async fn spawn_engine() -> (SocketAddr, HealthReporter) {
        let (reporter, service) = tonic_health::server::health_reporter();
        (serve(Routes::new(service)).await, reporter)
    }

    /// Accepts health checks and never answers them.
    struct StalledHealth;

    #[tonic::async_trait]
    impl Health for StalledHealth {
        async fn check(
            &self,
            _req: Request<HealthCheckRequest>,
        ) -> Result<Response<HealthCheckResponse>, Status> {
            std::future::pending().await
        }

        type WatchStream = tokio_stream::Pending<Result<HealthCheckResponse, Status>>;

        async fn watch(
            &self,
            _req: Request<HealthCheckRequest>,
        ) -> Result<Response<Self::WatchStream>, Status> {
            Ok(Response::new(tokio_stream::pending()))
        }
    }

    /// Echoes the horizon plus the item count, so tests can see what arrived.
    struct EchoEngine;

    #[tonic::async_trait]
    impl MlEngineService for EchoEngine {
        async fn get_predict_metric(
            &self,
            req: Request<ReqGetPredictMetric>,
        ) -> Result<Response<ResGetPredictMetric>, Status> {
            let req = req.into_inner();
            if req.observations.iter().any(|item| item.timestamp.is_none()) {
                return Err(Status::invalid_argument("item without timestamp"));
            }
            Ok(Response::new(ResGetPredictMetric {
                result_metric: req.forecast_horizon as i64 * 100 + req.observations.len() as i64,
            }))
        }
    }

    async fn serve(routes: Routes) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(
            Server::builder()
                .layer(tonic::service::interceptor(require_key))
                .add_routes(routes)
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );
        addr
    }

    fn local(addr: SocketAddr) -> EngineConfig {
        EngineConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            insecure: true,
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn health_passes_with_api_key() {
        let (addr, _reporter) = spawn_engine().await;
        let client = EngineClient::connect(&local(addr), &Secret::new(KEY))
            .await
            .unwrap();
        client.health().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_api_key_degrades_health() {
        let (addr, _reporter) = spawn_engine().await;
        let client = EngineClient::connect(&local(addr), &Secret::new("x.y.z"))
            .await
            .unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ScalerError::DegradedHealth(ref msg) if msg.contains("bad api key")));
        assert!(err.to_string().ends_with("code: Unauthenticated"));
    }

    #[tokio::test]
    async fn silent_engine_hits_the_request_timeout() {
        let addr = serve(Routes::new(HealthServer::new(StalledHealth))).await;
        let config = EngineConfig {
            request_timeout: Duration::from_millis(200),
            ..local(addr)
        };
        let client = EngineClient::connect(&config, &Secret::new(KEY))
            .await
            .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), client.health())
            .await
            .expect("health check should give up on its own")
            .unwrap_err();
        assert!(matches!(err, ScalerError::DegradedHealth(_)));
    }

    #[tokio::test]
    async fn predict_reaches_the_engine_with_the_api_key() {
        let addr = serve(Routes::new(MlEngineServiceServer::new(EchoEngine))).await;
        let client = EngineClient::connect(&local(addr), &Secret::new(KEY))
            .await
            .unwrap();
        let obs = Observation {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            value: 4.0,
            metric_name: "m".into(),
        };

        let forecast = client.predict(3, &[obs.clone(), obs]).await.unwrap();
        assert_eq!(forecast, 302);
    }

    #[tokio::test]
    async fn not_serving_degrades_health() {
        let (addr, mut reporter) = spawn_engine().await;
        reporter
            .set_service_status("", tonic_health::ServingStatus::NotServing)
            .await;
        let client = EngineClient::connect(&local(addr), &Secret::new(KEY))
            .await
            .unwrap();
        let err = client.health().await.unwrap_err();
        assert!(err.to_string().starts_with("can't connect grpc server"));
        assert!(err.to_string().contains("NOT_SERVING"));
    }

    #[tokio::test]
    async fn predict_status_is_a_query_error() {
        // The test engine only serves health, so predict is unimplemented.
        let (addr, _reporter) = spawn_engine().await;
        let client = EngineClient::connect(&local(addr), &Secret::new(KEY))
            .await
            .unwrap();
        let err = client.predict(3, &[]).await.unwrap_err();
        assert!(matches!(err, ScalerError::Query(_)));
    }

    #[tokio::test]
    async fn unreachable_engine_fails_to_connect() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = EngineClient::connect(&local(addr), &Secret::new(KEY))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ScalerError::Connection(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn ca_bundle_must_contain_a_certificate() {
        let ca = rcgen::generate_simple_self_signed(vec!["engine.local".to_string()]).unwrap();
        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(ca.cert.pem().as_bytes()).unwrap();
        load_ca(good.path()).unwrap();

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        empty.write_all(b"not a pem bundle\n").unwrap();
        let err = load_ca(empty.path()).unwrap_err();
        assert!(err.to_string().contains("no certificates"));

        let missing = load_ca(Path::new("/nonexistent/ca.pem")).unwrap_err();
        assert!(missing.is_fatal());
    }

    #[test]
    fn observations_keep_sub_second_precision() {
        let obs = Observation {
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_250).unwrap(),
            value: 2.5,
            metric_name: "m".into(),
        };
        let item = to_item(&obs);
        let ts = item.timestamp.unwrap();
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 250_000_000);
        assert_eq!(item.value, 2.5);
    }

    #[test]
    fn api_key_must_be_ascii_metadata() {
        assert!(ApiKeyInterceptor::new(&Secret::new("bad\nkey")).is_err());
    }
}
