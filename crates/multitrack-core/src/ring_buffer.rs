//! Lock-free single-producer/single-consumer sample queue
//!
//! Each track streams decoded audio from its fill thread to the audio
//! callback through one of these. It is a thin layer over `rtrb` that copies
//! whole blocks of interleaved samples at a time, never blocks, and keeps the
//! classic "one slot always empty" accounting: for a buffer created with
//! capacity `C`, `available() + free_space() == C - 1` at every instant.

use rtrb::{Consumer, Producer};

use crate::types::Sample;

/// Constructor for a producer/consumer pair
pub struct RingBuffer;

impl RingBuffer {
    /// Create a ring buffer with capacity `capacity` samples.
    ///
    /// At most `capacity - 1` samples can be queued at once. Capacities
    /// smaller than 2 are raised to 2.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> (RingProducer, RingConsumer) {
        let capacity = capacity.max(2);
        let (producer, consumer) = rtrb::RingBuffer::<Sample>::new(capacity - 1);
        (
            RingProducer { inner: producer, capacity },
            RingConsumer { inner: consumer, capacity },
        )
    }
}

/// Writing half, owned by the track's fill thread
pub struct RingProducer {
    inner: Producer<Sample>,
    capacity: usize,
}

impl RingProducer {
    /// Copy up to `data.len()` samples in, returning how many were written.
    ///
    /// Writes `min(data.len(), free_space())` samples; never blocks.
    pub fn write(&mut self, data: &[Sample]) -> usize {
        let n = data.len().min(self.inner.slots());
        if n == 0 {
            return 0;
        }
        match self.inner.write_chunk(n) {
            Ok(mut chunk) => {
                let (first, second) = chunk.as_mut_slices();
                let split = first.len();
                first.copy_from_slice(&data[..split]);
                second.copy_from_slice(&data[split..n]);
                chunk.commit_all();
                n
            }
            Err(_) => 0,
        }
    }

    /// Number of samples that can be written right now
    pub fn free_space(&self) -> usize {
        self.inner.slots()
    }

    /// Number of samples queued and not yet read
    pub fn available(&self) -> usize {
        self.usable() - self.inner.slots()
    }

    /// Nominal capacity `C` (one less than this is usable)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn usable(&self) -> usize {
        self.capacity - 1
    }
}

/// Reading half, owned by whoever renders the track
pub struct RingConsumer {
    inner: Consumer<Sample>,
    capacity: usize,
}

impl RingConsumer {
    /// Copy up to `data.len()` samples out, returning how many were read.
    ///
    /// Reads `min(data.len(), available())` samples; never blocks.
    pub fn read(&mut self, data: &mut [Sample]) -> usize {
        let n = data.len().min(self.inner.slots());
        if n == 0 {
            return 0;
        }
        match self.inner.read_chunk(n) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                let split = first.len();
                data[..split].copy_from_slice(first);
                data[split..n].copy_from_slice(second);
                chunk.commit_all();
                n
            }
            Err(_) => 0,
        }
    }

    /// Number of samples queued and not yet read
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Number of samples that can be written right now
    pub fn free_space(&self) -> usize {
        (self.capacity - 1) - self.inner.slots()
    }

    /// Nominal capacity `C`
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard everything queued.
    ///
    /// Takes both halves mutably, so neither side can be mid-operation. The
    /// read index only moves forward.
    pub fn reset(&mut self, producer: &mut RingProducer) {
        debug_assert_eq!(self.capacity, producer.capacity);
        let queued = self.inner.slots();
        if queued > 0 {
            if let Ok(chunk) = self.inner.read_chunk(queued) {
                chunk.commit_all();
            }
        }
        debug_assert_eq!(producer.available(), 0);
    }
}
