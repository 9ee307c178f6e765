//! Pipeline orchestration: owns both queues, the map worker pool and the
//! reduce worker, assigns sequence indices and drains everything on close.
//!
//! Data flow: `submit -> input fifo -> W map workers -> ordered queue ->
//! reduce worker -> sink`. Each input is tagged with a dense `u64` index at
//! submit; the ordered queue reassembles worker outputs by that index, so
//! the reducer sees submission order no matter how the workers interleave.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use tracing::{debug, error, info};

use crate::api::{Mapper, Reducer};
use crate::config::DispatcherConfig;
use crate::error::{Error, PushError};
use crate::fifo::SyncFifo;
use crate::ordered::OrderedQueue;
use crate::stats::{Counters, StatsSnapshot};

// State shared between the submitter and every worker. A worker failure
// poisons the pipeline: the failure is stored (last one wins), submits fail
// fast, and the workers keep draining without processing so close() never
// hangs on a half-finished stream.
struct PipelineState {
    poisoned: AtomicBool,
    failure: Mutex<Option<anyhow::Error>>,
    counters: Counters,
}

impl PipelineState {
    fn new() -> Self {
        Self {
            poisoned: AtomicBool::new(false),
            failure: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    fn poison(&self, err: anyhow::Error) {
        *self.failure.lock().unwrap() = Some(err);
        self.poisoned.store(true, Ordering::Release);
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    fn take_failure(&self) -> Option<anyhow::Error> {
        self.failure.lock().unwrap().take()
    }
}

pub struct Dispatcher<M: Mapper + 'static> {
    input: Arc<SyncFifo<(u64, M::Input)>>,
    ordered: Arc<OrderedQueue<Option<M::Output>>>,
    state: Arc<PipelineState>,
    map_workers: Vec<JoinHandle<()>>,
    reduce_worker: Option<JoinHandle<()>>,
    next_index: u64,
    closed: bool,
}

impl<M: Mapper + 'static> Dispatcher<M> {
    pub fn new<R>(mapper: M, reducer: R) -> Result<Self, Error>
    where
        R: Reducer<Input = M::Output> + 'static,
    {
        Self::with_config(mapper, reducer, DispatcherConfig::default())
    }

    pub fn with_config<R>(mapper: M, reducer: R, config: DispatcherConfig) -> Result<Self, Error>
    where
        R: Reducer<Input = M::Output> + 'static,
    {
        config.validate()?;

        let input = Arc::new(SyncFifo::new(config.input_buffer_size));
        let ordered = Arc::new(OrderedQueue::new(config.ordered_queue_capacity));
        let state = Arc::new(PipelineState::new());
        let mapper = Arc::new(mapper);

        info!(
            workers = config.num_mapper_threads,
            input_buffer = config.input_buffer_size,
            reorder_capacity = config.ordered_queue_capacity,
            "pipeline starting"
        );

        let mut map_workers = Vec::with_capacity(config.num_mapper_threads);
        for worker_id in 0..config.num_mapper_threads {
            let input = Arc::clone(&input);
            let ordered = Arc::clone(&ordered);
            let mapper = Arc::clone(&mapper);
            let state = Arc::clone(&state);
            map_workers.push(thread::spawn(move || {
                run_map_worker(worker_id, &input, &ordered, mapper.as_ref(), &state);
            }));
        }

        let reduce_worker = {
            let ordered = Arc::clone(&ordered);
            let state = Arc::clone(&state);
            thread::spawn(move || run_reduce_worker(&ordered, reducer, &state))
        };

        Ok(Self {
            input,
            ordered,
            state,
            map_workers,
            reduce_worker: Some(reduce_worker),
            next_index: 0,
            closed: false,
        })
    }

    /// Tags the input with the next sequence index and hands it to the
    /// worker pool. Blocks while the input buffer is full.
    pub fn submit(&mut self, input: M::Input) -> Result<(), Error> {
        if self.closed {
            return Err(Error::SubmitAfterClose);
        }
        if self.state.is_poisoned() {
            return Err(Error::Poisoned);
        }
        match self.input.push((self.next_index, input)) {
            Ok(()) => {
                // The index is burned only on success; a rejected submit must
                // not leave a hole in the ordered stream.
                self.next_index += 1;
                self.state.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(PushError(_)) => Err(Error::SubmitAfterClose),
        }
    }

    /// Blocks until every submitted input has flowed through both stages,
    /// then reports the recorded worker failure, if any, exactly once.
    /// Idempotent; subsequent calls return Ok.
    pub fn close(&mut self) -> Result<(), Error> {
        self.drain_workers();
        match self.state.take_failure() {
            Some(err) => Err(Error::Worker(err)),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.counters.snapshot()
    }

    // Shutdown protocol. The order matters: only after every map worker has
    // exited can no further intermediate appear, which makes closing the
    // ordered queue safe; the reduce worker then drains it to end-of-stream.
    fn drain_workers(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!(submitted = self.next_index, "closing pipeline");
        self.input.close();
        for handle in self.map_workers.drain(..) {
            join_worker(handle);
        }
        self.ordered.close();
        if let Some(handle) = self.reduce_worker.take() {
            join_worker(handle);
        }
        debug!("pipeline drained");
    }
}

impl<M: Mapper + 'static> Drop for Dispatcher<M> {
    fn drop(&mut self) {
        self.drain_workers();
        if let Some(err) = self.state.take_failure() {
            error!("pipeline dropped with unreported worker failure: {:#}", err);
        }
    }
}

fn run_map_worker<M: Mapper>(
    worker_id: usize,
    input: &SyncFifo<(u64, M::Input)>,
    ordered: &OrderedQueue<Option<M::Output>>,
    mapper: &M,
    state: &PipelineState,
) {
    debug!(worker_id, "map worker started");
    while let Some((index, item)) = input.pop() {
        let slot = if state.is_poisoned() {
            None
        } else {
            match catch_map(mapper, item) {
                Ok(out) => {
                    state.counters.mapped.fetch_add(1, Ordering::Relaxed);
                    Some(out)
                }
                Err(err) => {
                    error!(worker_id, index, "map failed: {:#}", err);
                    state.counters.map_errors.fetch_add(1, Ordering::Relaxed);
                    state.poison(err);
                    None
                }
            }
        };
        // An empty slot keeps the index sequence dense, so a failed map can
        // never stall the reducer on a gap.
        if ordered.push(index, slot).is_err() {
            break;
        }
    }
    debug!(worker_id, "map worker exiting");
}

fn run_reduce_worker<R: Reducer>(
    ordered: &OrderedQueue<Option<R::Input>>,
    mut reducer: R,
    state: &PipelineState,
) {
    debug!("reduce worker started");
    while let Some((index, slot)) = ordered.pop() {
        // Empty slots mark indices whose map call failed; they are drained
        // without ever reaching the reducer.
        let Some(item) = slot else { continue };
        if state.is_poisoned() {
            continue;
        }
        match catch_reduce(&mut reducer, item) {
            Ok(()) => {
                state.counters.reduced.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                error!(index, "reduce failed: {:#}", err);
                state.counters.reduce_errors.fetch_add(1, Ordering::Relaxed);
                state.poison(err);
            }
        }
    }
    debug!("reduce worker exiting");
}

// User code may panic instead of returning an error; either way the worker
// loop must survive to keep the index sequence dense.
fn catch_map<M: Mapper>(mapper: &M, input: M::Input) -> anyhow::Result<M::Output> {
    panic::catch_unwind(AssertUnwindSafe(|| mapper.map(input)))
        .unwrap_or_else(|payload| Err(anyhow!("map panicked: {}", panic_message(&*payload))))
}

fn catch_reduce<R: Reducer>(reducer: &mut R, item: R::Input) -> anyhow::Result<()> {
    panic::catch_unwind(AssertUnwindSafe(|| reducer.reduce(item)))
        .unwrap_or_else(|payload| Err(anyhow!("reduce panicked: {}", panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if let Err(payload) = handle.join() {
        // User panics are converted to errors inside the worker loops;
        // anything surfacing here is an internal invariant breach.
        panic::resume_unwind(payload);
    }
}
