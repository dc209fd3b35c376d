use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use medichat::config::{ChunkArgs, EmbedderArgs, PineconeArgs};
use medichat::vector_store::DEFAULT_UPSERT_BATCH;
use medichat::{logging, prepare_chunks, DirectoryLoader, Ingestor};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "medichat-ingest",
    about = "Load, chunk and embed a directory of PDFs into the Pinecone index"
)]
struct IngestCli {
    /// Directory containing the source documents
    #[arg(long, env = "MEDICHAT_DATA_DIR", default_value = "data/")]
    data_dir: PathBuf,

    /// File extensions to load, comma separated (pdf, txt, md)
    #[arg(
        long,
        env = "MEDICHAT_EXTENSIONS",
        value_delimiter = ',',
        default_value = "pdf"
    )]
    extensions: Vec<String>,

    /// Records sent per upsert request
    #[arg(long, env = "MEDICHAT_UPSERT_BATCH", default_value_t = DEFAULT_UPSERT_BATCH)]
    upsert_batch: usize,

    /// Only load and chunk; skip embedding and upserts
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(flatten)]
    chunks: ChunkArgs,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    pinecone: PineconeArgs,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();
    let cli = IngestCli::parse();

    let loader = DirectoryLoader::new(&cli.data_dir, &cli.extensions)?;
    let chunker = cli.chunks.chunker()?;
    if cli.dry_run {
        let (documents, chunks) = prepare_chunks(&loader, &chunker)?;
        info!(
            documents,
            chunks = chunks.len(),
            "dry run complete; nothing embedded"
        );
        return Ok(());
    }

    let embedder = cli.embedder.build()?;
    let pinecone = cli.pinecone.client()?;
    let spec = cli.pinecone.index_spec()?;
    let report =
        Ingestor::new(embedder.as_ref(), &pinecone, spec, cli.upsert_batch).run(&loader, &chunker)?;

    info!(
        documents = report.documents,
        chunks = report.chunks,
        upserted = report.upserted,
        index_created = report.index_created,
        "ingestion complete"
    );
    if report.chunks == 0 {
        warn!("no chunks qualified for embedding; check the data directory and extensions");
    }
    Ok(())
}
