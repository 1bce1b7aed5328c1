use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = PathBuf::from("proto");
    let protos = [proto_root.join("ml_engine.proto")];

    for proto in &protos {
        println!("cargo:rerun-if-changed={}", proto.display());
    }

    // Vendored protoc so the build does not depend on a system install.
    let mut config = prost_build::Config::new();
    config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);
    let well_known = protoc_bin_vendored::include_path()?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos_with_config(config, &protos, &[proto_root, well_known])?;

    Ok(())
}
