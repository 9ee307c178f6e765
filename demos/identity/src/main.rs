use anyhow::{ensure, Result};
use clap::Parser;
use rand::Rng;
use sluice::{Dispatcher, DispatcherConfig, Mapper, Reducer};
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Number of inputs to push through the pipeline
    #[arg(long, default_value_t = 1000)]
    count: u64,
    /// Map worker threads
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Input buffer capacity
    #[arg(long, default_value_t = 8)]
    buffer: usize,
    /// Upper bound on the artificial map latency, in milliseconds
    #[arg(long, default_value_t = 20)]
    jitter_ms: u64,
}

struct JitterMapper {
    max_ms: u64,
}

impl Mapper for JitterMapper {
    type Input = u64;
    type Output = u64;

    fn map(&self, input: u64) -> Result<u64> {
        if self.max_ms > 0 {
            let ms = rand::thread_rng().gen_range(0..=self.max_ms);
            thread::sleep(Duration::from_millis(ms));
        }
        Ok(input)
    }
}

struct SequenceCheck {
    next: u64,
}

impl Reducer for SequenceCheck {
    type Input = u64;

    fn reduce(&mut self, item: u64) -> Result<()> {
        ensure!(
            item == self.next,
            "out of order: expected {}, got {}",
            self.next,
            item
        );
        self.next += 1;
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let config = DispatcherConfig {
        input_buffer_size: args.buffer,
        num_mapper_threads: args.workers,
        ordered_queue_capacity: args.buffer + args.workers,
    };
    let mut dispatcher = Dispatcher::with_config(
        JitterMapper {
            max_ms: args.jitter_ms,
        },
        SequenceCheck { next: 0 },
        config,
    )?;
    for i in 0..args.count {
        dispatcher.submit(i)?;
    }
    dispatcher.close()?;
    let stats = dispatcher.stats();
    info!(
        submitted = stats.submitted,
        reduced = stats.reduced,
        "pipeline drained in submission order"
    );
    Ok(())
}
