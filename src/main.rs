use anyhow::Context;
use clap::Parser;
use profilestorepb::profile_store_service_server::ProfileStoreServiceServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tonic::codec::CompressionEncoding;
use tonic::transport::Server;

mod config;
mod metastore;
mod normalizer;
mod profile;
mod profile_store;
mod storage;

pub(crate) mod profilestorepb {
    tonic::include_proto!("parca.profilestore.v1alpha1");
}

pub(crate) mod pprofpb {
    tonic::include_proto!("perftools.profiles");
}

/// Continuous profiling ingestion server.
#[derive(Parser, Debug)]
#[command(name = "evstore", version, about)]
struct Flags {
    /// Path to the YAML config file. Defaults apply when omitted.
    #[arg(long)]
    config_path: Option<PathBuf>,

    /// Log level.
    #[arg(long, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    log_level: String,

    /// Address the gRPC server listens on.
    #[arg(long, default_value = "[::]:7070")]
    address: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    init_logger(&flags.log_level)?;

    let cfg = match &flags.config_path {
        Some(path) => config::Config::load(path)?,
        None => config::Config::default(),
    };
    log::debug!("Loaded config: {:?}", cfg);

    log::info!("Starting Server");

    let db = Arc::new(storage::MemDb::new(cfg.max_series));
    let meta_store = Arc::new(metastore::InMemoryMetaStore::default());

    log::info!("Attaching ProfileStoreService to the server");
    let profile_store_impl = profile_store::ProfileStore::new(
        Arc::clone(&db) as Arc<dyn storage::Appendable>,
        Arc::clone(&meta_store) as Arc<dyn metastore::MetaStore>,
        profile::ProfileDecoder::new(cfg.max_profile_size),
    );

    let service = ProfileStoreServiceServer::new(profile_store_impl)
        .accept_compressed(CompressionEncoding::Gzip)
        .max_decoding_message_size(cfg.max_message_size);

    log::info!("Starting server at {}", flags.address);
    Server::builder()
        .timeout(cfg.request_timeout)
        .add_service(service)
        .serve_with_shutdown(flags.address, shutdown_signal())
        .await
        .with_context(|| format!("serving on {}", flags.address))?;

    let db_stats = db.stats()?;
    let meta_stats = meta_store.stats()?;
    log::info!(
        "Server stopped, holding {} series with {} profiles, {} locations, {} functions, {} mappings",
        db_stats.series,
        db_stats.profiles,
        meta_stats.locations,
        meta_stats.functions,
        meta_stats.mappings
    );

    Ok(())
}

fn init_logger(level: &str) -> anyhow::Result<()> {
    let level: log::LevelFilter = level
        .parse()
        .with_context(|| format!("invalid log level: {}", level))?;

    let mut builder = colog::default_builder();
    builder.filter(None, level);
    builder.try_init()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Received shutdown signal, draining in-flight requests");
}
