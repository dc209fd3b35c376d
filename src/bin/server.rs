use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use medichat::config::{ChatArgs, EmbedderArgs, PineconeArgs};
use medichat::{logging, server, IndexCatalog, QueryService};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "medichat-server",
    about = "HTTP chat endpoint answering questions from the Pinecone index"
)]
struct ServerCli {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "MEDICHAT_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    pinecone: PineconeArgs,

    #[command(flatten)]
    chat: ChatArgs,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();
    let cli = ServerCli::parse();
    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;

    // blocking HTTP clients are created and dropped outside the async runtime
    let embedder = cli.embedder.build()?;
    let pinecone = cli.pinecone.client()?;
    let index = pinecone.open_index(&cli.pinecone.index_name)?;
    let chat = cli.chat.build()?;
    let service = Arc::new(QueryService::new(
        embedder,
        index,
        chat,
        cli.chat.query_config(),
    )?);
    info!(
        index = %cli.pinecone.index_name,
        top_k = service.config().top_k,
        "query service ready"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(async {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        server::serve(
            listener,
            server::router(Arc::clone(&service)),
            server::shutdown_signal(),
        )
        .await
    })?;
    drop(runtime);
    Ok(())
}
