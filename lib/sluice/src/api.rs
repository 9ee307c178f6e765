use anyhow::Result;

// The map side of the pipeline. Invoked concurrently from every map worker
// with no synchronization around the call, so implementations must be safe
// to share. The input moves in, the intermediate moves out; nothing may be
// retained by reference beyond the call.
pub trait Mapper: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn map(&self, input: Self::Input) -> Result<Self::Output>;
}

// The reduce side. Invoked from exactly one thread, in submission order,
// once per successfully mapped input. May perform I/O; no concurrency
// obligations on the implementation.
pub trait Reducer: Send {
    type Input: Send + 'static;

    fn reduce(&mut self, item: Self::Input) -> Result<()>;
}
