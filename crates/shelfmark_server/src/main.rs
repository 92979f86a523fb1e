use clap::Parser;
use shelfmark_core::{
    catalog::init_catalog,
    transport::grpc::{
        CatalogRouter, DEFAULT_GRPC_PORT,
        proto::{CATALOG_DESCRIPTOR_SET, catalog_server::CatalogServer},
    },
};
use tonic::transport::Server;
use tonic_reflection::server::Builder;

#[derive(Parser)]
#[command(about = "Inventory cataloging gRPC server")]
struct ShelfmarkServerArgs {
    /// Address to listen on
    #[arg(long, default_value = "[::1]")]
    address: String,
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_GRPC_PORT)]
    port: u16,
    /// Serve gRPC reflection
    #[arg(long, default_value_t = false)]
    reflection: bool,
}

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "shelfmark_tracing")]
    shelfmark_core::shelfmark_tracing::init();

    let args = ShelfmarkServerArgs::parse();
    let catalog = init_catalog();

    let address = format!("{}:{}", args.address, args.port).parse()?;
    let mut server =
        Server::builder().add_service(CatalogServer::new(CatalogRouter::new(catalog)));

    if args.reflection {
        let reflection_service = Builder::configure()
            .register_encoded_file_descriptor_set(CATALOG_DESCRIPTOR_SET)
            .build_v1()?;
        server = server.add_service(reflection_service);
    }

    server.serve(address).await?;

    Ok(())
}
