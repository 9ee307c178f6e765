use anyhow::Result;
use clap::Parser;
use sluice::{ByteChunk, Dispatcher, DispatcherConfig, FileSink, Mapper};
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Output file
    #[arg(long)]
    output: String,
    /// Number of chunks to write
    #[arg(long, default_value_t = 256)]
    count: u64,
    /// Map worker threads
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Bytes per chunk
    #[arg(long, default_value_t = 1)]
    chunk_len: usize,
}

struct ChunkMapper {
    chunk_len: usize,
}

impl Mapper for ChunkMapper {
    type Input = u64;
    type Output = ByteChunk;

    fn map(&self, input: u64) -> Result<ByteChunk> {
        Ok(ByteChunk::filled((input % 256) as u8, self.chunk_len))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let config = DispatcherConfig {
        num_mapper_threads: args.workers,
        ..DispatcherConfig::default()
    };
    let sink = FileSink::create(&args.output)?;
    let mut dispatcher = Dispatcher::with_config(
        ChunkMapper {
            chunk_len: args.chunk_len,
        },
        sink,
        config,
    )?;
    for i in 0..args.count {
        dispatcher.submit(i)?;
    }
    dispatcher.close()?;
    let stats = dispatcher.stats();
    info!(
        output = %args.output,
        chunks = stats.reduced,
        "file written in submission order"
    );
    Ok(())
}
