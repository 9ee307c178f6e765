//! Property tests: ordering, exactly-once and completeness must hold for
//! any pipeline shape and any out-of-order insertion pattern.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use proptest::prelude::*;
use sluice::{Dispatcher, DispatcherConfig, Mapper, OrderedQueue, VecSink};

// Deterministic jitter: stalls derived from the value keep workers finishing
// out of order without randomness inside the test body.
struct ValueJitter;

impl Mapper for ValueJitter {
    type Input = u64;
    type Output = u64;

    fn map(&self, input: u64) -> Result<u64> {
        if input % 7 == 0 {
            thread::sleep(Duration::from_millis(input % 3));
        }
        Ok(input)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ordering_holds_for_any_pipeline_shape(
        len in 0u64..150,
        workers in 1usize..6,
        input_buffer in 1usize..8,
        reorder in 1usize..8,
    ) {
        let config = DispatcherConfig {
            input_buffer_size: input_buffer,
            num_mapper_threads: workers,
            ordered_queue_capacity: reorder,
        };
        let sink = VecSink::new();
        let out = sink.handle();
        let mut dispatcher = Dispatcher::with_config(ValueJitter, sink, config).unwrap();
        for i in 0..len {
            dispatcher.submit(i).unwrap();
        }
        dispatcher.close().unwrap();

        // Order, exactly-once and completeness in one comparison.
        let got = out.lock().unwrap().clone();
        prop_assert_eq!(got, (0..len).collect::<Vec<u64>>());

        let stats = dispatcher.stats();
        prop_assert_eq!(stats.submitted, len);
        prop_assert_eq!(stats.mapped, len);
        prop_assert_eq!(stats.reduced, len);
    }

    #[test]
    fn shuffled_insertion_releases_sequentially(
        indices in Just((0..64u64).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let queue = OrderedQueue::new(64);
        for &index in &indices {
            queue.push(index, index).unwrap();
        }
        queue.close();
        let mut expected = 0u64;
        while let Some((index, value)) = queue.pop() {
            prop_assert_eq!(index, expected);
            prop_assert_eq!(value, expected);
            expected += 1;
        }
        prop_assert_eq!(expected, 64);
    }
}
