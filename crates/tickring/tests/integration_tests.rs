use std::sync::Arc;
use std::thread;
use tickring::{MpscRing, SpscRing};

#[test]
fn test_spsc_fifo_stress() {
    const N: u64 = 1_000_000;

    let ring = Arc::new(SpscRing::<u64>::with_capacity(8192));

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            for i in 0..N {
                while !ring.push(i) {
                    thread::yield_now();
                }
            }
        })
    };

    let consumer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            let mut expected = 0u64;
            while expected < N {
                match ring.pop() {
                    Some(value) => {
                        assert_eq!(
                            value, expected,
                            "FIFO violation: expected {expected}, got {value}"
                        );
                        expected += 1;
                    }
                    None => thread::yield_now(),
                }
            }
            expected
        })
    };

    producer.join().expect("producer panicked");
    let received = consumer.join().expect("consumer panicked");
    assert_eq!(received, N);
    assert!(ring.is_empty());
}

#[test]
fn test_spsc_batch_drain_under_load() {
    const N: u64 = 200_000;

    let ring = Arc::new(SpscRing::<u64>::with_capacity(4096));

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            for i in 0..N {
                while !ring.push(i) {
                    thread::yield_now();
                }
            }
        })
    };

    let mut expected = 0u64;
    while expected < N {
        let consumed = ring.pop_batch(512, |value| {
            assert_eq!(value, expected);
            expected += 1;
        });
        if consumed == 0 {
            thread::yield_now();
        }
    }

    producer.join().expect("producer panicked");
    assert_eq!(expected, N);
}

#[test]
fn test_mpsc_completeness() {
    const N_PRODUCERS: usize = 4;
    const ITEMS_PER_PRODUCER: u64 = 50_000;

    let ring = Arc::new(MpscRing::<(usize, u64)>::with_capacity(8192));
    let mut handles = Vec::new();

    for producer_id in 0..N_PRODUCERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for i in 0..ITEMS_PER_PRODUCER {
                while !ring.push((producer_id, i)) {
                    thread::yield_now();
                }
            }
        }));
    }

    // Per-producer streams must arrive gapless and in order, even though the
    // global interleaving depends on commit order.
    let mut next_expected = vec![0u64; N_PRODUCERS];
    let total = N_PRODUCERS as u64 * ITEMS_PER_PRODUCER;
    let mut count = 0u64;
    while count < total {
        match ring.pop() {
            Some((producer_id, value)) => {
                assert_eq!(
                    value, next_expected[producer_id],
                    "producer {producer_id} out of order"
                );
                next_expected[producer_id] += 1;
                count += 1;
            }
            None => thread::yield_now(),
        }
    }

    for handle in handles {
        handle.join().expect("producer panicked");
    }
    assert_eq!(count, total);
    assert!(next_expected.iter().all(|&n| n == ITEMS_PER_PRODUCER));
    assert!(ring.pop().is_none());
}

#[test]
fn test_mpsc_more_producers_than_capacity() {
    // A ring smaller than the producer count: admission must stay bounded,
    // so every item still arrives exactly once.
    const N_PRODUCERS: usize = 8;
    const ITEMS_PER_PRODUCER: u64 = 2_000;

    let ring = Arc::new(MpscRing::<u64>::with_capacity(4));
    let mut handles = Vec::new();

    for producer_id in 0..N_PRODUCERS as u64 {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for i in 0..ITEMS_PER_PRODUCER {
                let value = producer_id * ITEMS_PER_PRODUCER + i;
                while !ring.push(value) {
                    thread::yield_now();
                }
            }
        }));
    }

    let total = N_PRODUCERS * ITEMS_PER_PRODUCER as usize;
    let mut seen = vec![false; total];
    let mut count = 0;
    while count < total {
        match ring.pop() {
            Some(value) => {
                let idx = value as usize;
                assert!(!seen[idx], "duplicate delivery of {value}");
                seen[idx] = true;
                count += 1;
            }
            None => thread::yield_now(),
        }
    }

    for handle in handles {
        handle.join().expect("producer panicked");
    }
    assert!(seen.iter().all(|&s| s), "lost items");
    assert!(ring.pop().is_none());
}

#[test]
fn test_mpsc_bounded_rejection_counts() {
    // With no consumer running, pushes beyond capacity must fail cleanly.
    let ring = MpscRing::<u64>::with_capacity(64);

    let mut accepted = 0u64;
    let mut rejected = 0u64;
    for i in 0..100 {
        if ring.push(i) {
            accepted += 1;
        } else {
            rejected += 1;
        }
    }

    assert_eq!(accepted, 64);
    assert_eq!(rejected, 36);
}
