//! Pipeline sizing knobs and their hardware-derived defaults.

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Capacity of the input buffer upstream of the map workers. Larger
    /// values decouple the submitter further at the cost of memory.
    pub input_buffer_size: usize,
    /// Number of map worker threads.
    pub num_mapper_threads: usize,
    /// Capacity of the reorder buffer between map workers and the reducer.
    /// Larger values tolerate more out-of-order slippage before map workers
    /// block.
    pub ordered_queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        let hw = num_cpus::get();
        Self {
            input_buffer_size: hw + 1,
            num_mapper_threads: hw,
            // Every in-flight item gets a slot: buffered inputs plus one per worker.
            ordered_queue_capacity: (hw + 1) + hw,
        }
    }
}

impl DispatcherConfig {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.input_buffer_size == 0 {
            return Err(Error::InvalidConfig("input_buffer_size must be at least 1"));
        }
        if self.num_mapper_threads == 0 {
            return Err(Error::InvalidConfig("num_mapper_threads must be at least 1"));
        }
        if self.ordered_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "ordered_queue_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(DispatcherConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let config = DispatcherConfig {
            num_mapper_threads: 0,
            ..DispatcherConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_buffer_rejected() {
        let config = DispatcherConfig {
            input_buffer_size: 0,
            ..DispatcherConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
