// ============================================================================
// Lock-Free Ring Queue
// ============================================================================

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One queue slot. The sequence number encodes the slot's state relative to
/// the head/tail counters: `seq == pos` means free for the producer at `pos`,
/// `seq == pos + 1` means occupied for the consumer at `pos`.
struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded lock-free ring queue with power-of-two capacity.
///
/// `head` and `tail` increase monotonically and are masked into the slot
/// array; each sits on its own cache line so producers and consumers do not
/// false-share. The single-producer/single-consumer hand-off is wait-free;
/// the implementation additionally relaxes to multi-producer/multi-consumer
/// with CAS-based index bumping and per-slot sequence numbers, because the
/// engine's sharded queues can be fed from more than one ingress thread.
///
/// `try_push` publishes the item before releasing the slot sequence; `try_pop`
/// acquires the sequence before reading the item.
pub struct RingQueue<T> {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    mask: usize,
}

unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> RingQueue<T> {
    /// Create a queue with the given capacity.
    ///
    /// # Panics
    /// Panics unless `capacity` is a non-zero power of two. A bad capacity is
    /// a programmer error, not a runtime condition.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity.is_power_of_two(),
            "ring queue capacity must be a non-zero power of two, got {}",
            capacity
        );

        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: capacity - 1,
        }
    }

    /// Push an item without blocking.
    ///
    /// # Errors
    /// Returns the item back when the queue is full so the caller can apply
    /// its drop policy.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[tail & self.mask];
            let sequence = slot.sequence.load(Ordering::Acquire);
            let lag = sequence.wrapping_sub(tail) as isize;

            if lag == 0 {
                // Slot is free; claim it by bumping the tail.
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS above gives this thread exclusive
                        // ownership of the slot until the sequence store.
                        unsafe { (*slot.value.get()).write(item) };
                        slot.sequence.store(tail.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    },
                    Err(current) => tail = current,
                }
            } else if lag < 0 {
                // Consumer has not freed this slot yet: full.
                return Err(item);
            } else {
                // Another producer claimed the slot; reload and retry.
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Pop an item without blocking. Returns `None` when the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[head & self.mask];
            let sequence = slot.sequence.load(Ordering::Acquire);
            let lag = sequence.wrapping_sub(head.wrapping_add(1)) as isize;

            if lag == 0 {
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS above gives this thread exclusive
                        // ownership of the occupied slot.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(head.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(value);
                    },
                    Err(current) => head = current,
                }
            } else if lag < 0 {
                // Producer has not filled this slot yet: empty.
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Number of items currently queued.
    ///
    /// Exact when the queue is quiescent; a consistent snapshot is retried
    /// while producers and consumers are racing.
    pub fn len(&self) -> usize {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);
            if self.tail.load(Ordering::Acquire) == tail {
                return tail.wrapping_sub(head).min(self.capacity());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Drop all queued items.
    ///
    /// Not concurrent-safe: the `&mut` receiver guarantees no producer or
    /// consumer is active.
    pub fn clear(&mut self) {
        while self.try_pop().is_some() {}
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
