pub mod api;
pub mod chunk;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fifo;
pub mod ordered;
pub mod sink;
pub mod stats;
mod sync;

pub use api::{Mapper, Reducer};
pub use chunk::ByteChunk;
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{Error, PushError, Result};
pub use fifo::SyncFifo;
pub use ordered::OrderedQueue;
pub use sink::{FileSink, VecSink};
pub use stats::StatsSnapshot;
