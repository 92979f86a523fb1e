fn main() -> Result<(), Box<dyn std::error::Error>> {
    let descriptor_path =
        std::path::PathBuf::from(std::env::var("OUT_DIR")?).join("shelfmark_descriptor.bin");
    tonic_build::configure()
        .file_descriptor_set_path(descriptor_path)
        .compile_protos(&["proto/shelfmark.proto"], &["proto"])?;
    Ok(())
}
