use crate::RingConfig;
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Bounded multi-producer single-consumer ring buffer.
///
/// Producers reserve a slot by advancing the tail sequence with a bounded
/// compare-exchange (the reservation succeeds only while `tail - head <
/// capacity`, so live reservations can never exceed capacity and two
/// producers can never target the same physical slot) and publish it by
/// setting the slot's occupancy flag with release ordering. The single
/// consumer observes occupancy with acquire ordering before reading, clears
/// it with release after, and advances head with a plain store (it is the
/// only writer of head).
///
/// The consumer therefore sees slots in *commit* order: the order in which
/// producers released their flags, not the order of tail reservations. A
/// producer that stalls between reserving and publishing stalls the consumer
/// at that slot; the consumer polls occupancy and never blocks.
pub struct MpscRing<T> {
    /// Tail sequence; producers reserve slots with fetch-add.
    tail: CachePadded<AtomicU64>,
    /// Head sequence; written only by the consumer.
    head: CachePadded<AtomicU64>,
    slots: Box<[Slot<T>]>,
    config: RingConfig,
}

struct Slot<T> {
    /// Set between a producer's publish and the consumer's read.
    occupied: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

// Safety: slot hand-off is synchronized by the occupancy flag's
// release/acquire pair; T crosses threads, so it must be Send.
unsafe impl<T: Send> Send for MpscRing<T> {}
unsafe impl<T: Send> Sync for MpscRing<T> {}

impl<T> MpscRing<T> {
    /// Creates a ring with the given configuration.
    pub fn new(config: RingConfig) -> Self {
        let slots = (0..config.capacity())
            .map(|_| Slot {
                occupied: AtomicBool::new(false),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            slots,
            config,
        }
    }

    /// Creates a ring with `capacity` slots (must be a power of two).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(RingConfig::new(capacity))
    }

    /// Returns the ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// Approximate item count, clamped to capacity. The tail sequence counts
    /// reservations that may not be published yet, so this is advisory only.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        (tail.wrapping_sub(head) as usize).min(self.capacity())
    }

    /// Returns true if no published items are waiting.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire) == self.head.load(Ordering::Acquire)
    }

    /// Enqueues one item. Returns `false` when the ring is full.
    ///
    /// Callable from any number of producer threads. Admission and
    /// reservation are one atomic step: the compare-exchange on tail only
    /// goes through while `tail - head < capacity`, so a reservation's
    /// previous-lap occupant is always already consumed.
    pub fn push(&self, item: T) -> bool {
        let backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Relaxed);
        let pos = loop {
            let head = self.head.load(Ordering::Acquire);
            if tail.wrapping_sub(head) as usize >= self.capacity() {
                return false;
            }
            match self.tail.compare_exchange_weak(
                tail,
                tail.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break tail,
                Err(current) => {
                    tail = current;
                    backoff.spin();
                }
            }
        };
        let slot = &self.slots[(pos as usize) & self.mask()];

        while slot.occupied.load(Ordering::Acquire) {
            // The previous-lap occupant was consumed before head admitted
            // us, but its flag clear may not be visible yet (the consumer
            // advances head with a plain store). Wait out the window.
            backoff.snooze();
        }

        // SAFETY: the bounded reservation made `pos` exclusively ours, and
        // the flag being clear means the consumer is done with the previous
        // occupant.
        unsafe {
            (*slot.value.get()).write(item);
        }
        slot.occupied.store(true, Ordering::Release);
        true
    }

    /// Dequeues one item. Returns `None` when the head slot is unpublished.
    ///
    /// Must be called from the single consumer thread.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.slots[(head as usize) & self.mask()];

        if !slot.occupied.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the acquire load of the flag synchronizes with the
        // producer's release store, so the payload write is visible; the
        // single-consumer discipline makes the read exclusive.
        let item = unsafe { (*slot.value.get()).assume_init_read() };
        slot.occupied.store(false, Ordering::Release);

        // Plain advance: the consumer is the only writer of head, and slot
        // reuse is gated by the occupancy flag, not by head visibility.
        self.head.store(head.wrapping_add(1), Ordering::Relaxed);
        Some(item)
    }
}

impl<T> Drop for MpscRing<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if *slot.occupied.get_mut() {
                unsafe {
                    ptr::drop_in_place((*slot.value.get()).as_mut_ptr());
                }
            }
        }
    }
}
