//! Ready-made reducers: a binary file appender and an in-memory collector.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::error;

use crate::api::Reducer;
use crate::chunk::ByteChunk;

/// Appends each chunk to a single binary file, in the order the reducer
/// receives them. Buffered; flushed when the pipeline drains and drops it.
pub struct FileSink {
    out: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

impl Reducer for FileSink {
    type Input = ByteChunk;

    fn reduce(&mut self, item: ByteChunk) -> Result<()> {
        self.out.write_all(item.as_slice())?;
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            error!("file sink flush: {}", e);
        }
    }
}

/// Collects reduced items into a shared vector. Keep a [`VecSink::handle`]
/// before handing the sink to the dispatcher to read the output afterwards.
pub struct VecSink<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> VecSink<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<T>>> {
        Arc::clone(&self.items)
    }
}

impl<T> Default for VecSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Reducer for VecSink<T> {
    type Input = T;

    fn reduce(&mut self, item: T) -> Result<()> {
        self.items.lock().unwrap().push(item);
        Ok(())
    }
}
