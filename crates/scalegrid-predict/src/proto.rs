//! Wire types, client and server for `services.MlEngineService`, generated
//! from `proto/ml_engine.proto`.

tonic::include_proto!("services");
