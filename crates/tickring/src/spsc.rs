use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_initialized_read,
    debug_assert_monotonic,
};
use crate::RingConfig;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Classic SPSC producer-consumer protocol over unbounded u64 sequence
// counters. Wrapped slot indices are computed as `sequence & mask` only at
// the point of buffer access, which removes the ABA problem outright: at one
// tick per microsecond a u64 takes half a million years to wrap.
//
// Producer (push):
// 1. Load `tail` with Relaxed (only the producer writes tail)
// 2. Check space against `cached_head` (UnsafeCell, producer-private)
// 3. If the cache says full: refresh it with an Acquire load of `head`
// 4. Write the payload into the slot (protected by the protocol, no ordering)
// 5. Store `tail + 1` with Release (publishes the payload to the consumer)
//
// Consumer (pop):
// 1. Load `head` with Relaxed (only the consumer writes head)
// 2. Check availability against `cached_tail` (UnsafeCell, consumer-private)
// 3. If the cache says empty: refresh it with an Acquire load of `tail`
// 4. Move the payload out of the slot
// 5. Store `head + 1` with Release (returns the slot to the producer)
//
// `cached_head` is written only by the producer and `cached_tail` only by
// the consumer, so both live in UnsafeCell without atomics. The single
// producer / single consumer discipline is the caller's obligation; the
// engine thread holds the producing side and exactly one feed holds the
// consuming side.
//
// =============================================================================

/// Bounded single-producer single-consumer ring buffer.
///
/// The transport between the market-data engine and the feed facade.
/// Producer and consumer index groups are 128-byte aligned to defeat
/// prefetcher-induced false sharing; each side caches the other's index to
/// avoid cross-core reads on the fast path.
#[repr(C)]
pub struct SpscRing<T> {
    // === PRODUCER HOT === (128-byte aligned)
    /// Tail sequence (written by producer, read by consumer).
    tail: CacheAligned<AtomicU64>,
    /// Producer's cached view of head.
    cached_head: CacheAligned<UnsafeCell<u64>>,

    // === CONSUMER HOT === (128-byte aligned)
    /// Head sequence (written by consumer, read by producer).
    head: CacheAligned<AtomicU64>,
    /// Consumer's cached view of tail.
    cached_tail: CacheAligned<UnsafeCell<u64>>,

    // === CONFIG ===
    config: RingConfig,

    // === DATA BUFFER ===
    /// Fixed slot array; `Box<[T]>` because the size never changes after
    /// construction.
    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// Safety: the release/acquire protocol above synchronizes payload access;
// T only needs to be Send to cross the producer/consumer thread boundary.
unsafe impl<T: Send> Send for SpscRing<T> {}
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T> SpscRing<T> {
    /// Creates a ring with the given configuration.
    pub fn new(config: RingConfig) -> Self {
        let mut buffer = Vec::with_capacity(config.capacity());
        buffer.resize_with(config.capacity(), MaybeUninit::uninit);

        Self {
            tail: CacheAligned::new(AtomicU64::new(0)),
            cached_head: CacheAligned::new(UnsafeCell::new(0)),
            head: CacheAligned::new(AtomicU64::new(0)),
            cached_tail: CacheAligned::new(UnsafeCell::new(0)),
            config,
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
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

    /// Returns the current number of items. May be stale under concurrent
    /// access, but never negative.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    /// Returns true if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire) == self.head.load(Ordering::Acquire)
    }

    /// Returns true if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Enqueues one item. Returns `false` only when the ring is full.
    ///
    /// Must be called from the single producer thread. The payload is
    /// observable by the consumer after the release-store of `tail`.
    #[inline]
    pub fn push(&self, item: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);

        // Fast path: space according to the producer-private cache.
        // SAFETY: cached_head is written only by the producer (this path).
        let cached_head = unsafe { *self.cached_head.get() };
        if tail.wrapping_sub(cached_head) as usize >= self.capacity() {
            // Slow path: refresh the cache from the shared head.
            let head = self.head.load(Ordering::Acquire);
            // SAFETY: as above; the Acquire load synchronizes with the
            // consumer's Release store of head.
            unsafe {
                *self.cached_head.get() = head;
            }
            if tail.wrapping_sub(head) as usize >= self.capacity() {
                return false;
            }
        }

        let idx = (tail as usize) & self.mask();
        // SAFETY: the slot at `tail` is outside [head, tail) and therefore
        // unobserved by the consumer until the Release store below.
        unsafe {
            (*self.buffer.get())[idx].write(item);
        }

        let new_tail = tail.wrapping_add(1);
        debug_assert_monotonic!("tail", tail, new_tail);
        debug_assert_bounded_count!(
            new_tail.wrapping_sub(self.head.load(Ordering::Relaxed)) as usize,
            self.capacity()
        );
        self.tail.store(new_tail, Ordering::Release);
        true
    }

    /// Dequeues one item. Returns `None` only when the ring is empty.
    ///
    /// Must be called from the single consumer thread.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        // Fast path: availability according to the consumer-private cache.
        // SAFETY: cached_tail is written only by the consumer (this path).
        let mut cached_tail = unsafe { *self.cached_tail.get() };
        if cached_tail == head {
            cached_tail = self.tail.load(Ordering::Acquire);
            // SAFETY: as above; the Acquire load synchronizes with the
            // producer's Release store of tail.
            unsafe {
                *self.cached_tail.get() = cached_tail;
            }
            if cached_tail == head {
                return None;
            }
        }

        debug_assert_initialized_read!(head, head, cached_tail);
        let idx = (head as usize) & self.mask();
        // SAFETY: the slot at `head` lies in [head, tail): fully written by
        // the producer and published by the Release/Acquire pair on tail.
        // assume_init_read moves ownership out; the slot is dead until the
        // producer reuses it after head advances.
        let item = unsafe { (*self.buffer.get())[idx].assume_init_read() };

        let new_head = head.wrapping_add(1);
        debug_assert_monotonic!("head", head, new_head);
        debug_assert_head_not_past_tail!(new_head, cached_tail);
        self.head.store(new_head, Ordering::Release);
        Some(item)
    }

    /// Drains up to `max` items into `handler` with a single head update.
    ///
    /// Amortizes the atomic store over the whole batch; the feed facade uses
    /// this to catch up after a scheduling hiccup. Returns the number of
    /// items consumed.
    pub fn pop_batch<F>(&self, max: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        if max == 0 {
            return 0;
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return 0;
        }

        let to_consume = avail.min(max);
        let mask = self.mask();
        let mut pos = head;

        for _ in 0..to_consume {
            debug_assert_initialized_read!(pos, head, tail);
            let idx = (pos as usize) & mask;
            // SAFETY: same argument as `pop`; every slot in [head, tail) is
            // initialized and exclusively ours until head advances.
            let item = unsafe { (*self.buffer.get())[idx].assume_init_read() };
            handler(item);
            pos = pos.wrapping_add(1);
        }

        self.head
            .store(head.wrapping_add(to_consume as u64), Ordering::Release);
        to_consume
    }
}

impl<T> Drop for SpscRing<T> {
    fn drop(&mut self) {
        // Drop the unconsumed residue in [head, tail).
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let count = tail.wrapping_sub(head) as usize;

        if count > 0 {
            let mask = self.mask();
            let buffer = self.buffer.get_mut();
            for i in 0..count {
                let idx = ((head as usize).wrapping_add(i)) & mask;
                unsafe {
                    ptr::drop_in_place(buffer[idx].as_mut_ptr());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------
// HELPER: 128-byte cache-aligned wrapper
// ---------------------------------------------------------------------

/// Ensures 128-byte alignment to keep adjacent-line prefetchers from
/// coupling the producer and consumer index groups.
#[repr(align(128))]
pub(crate) struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
