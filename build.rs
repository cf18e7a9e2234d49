fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
    std::env::set_var("PROTOC", protoc);

    println!("cargo:rerun-if-changed=proto");
    tonic_build::compile_protos("proto/perftools/profiles/profile.proto")?;
    tonic_build::compile_protos("proto/parca/profilestore/v1alpha1/profilestore.proto")?;
    Ok(())
}
