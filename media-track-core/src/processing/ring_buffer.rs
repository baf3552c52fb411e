/// Fixed-capacity FIFO of audio samples feeding one mixer input.
///
/// Capture callbacks push, the mixer pulls. When the producer outruns the
/// consumer the oldest samples are discarded and counted in `dropped`.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    head: usize,
    len: usize,
    dropped: u64,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        let capacity = self.buffer.len();
        let skip = samples.len().saturating_sub(capacity);
        self.dropped += skip as u64;

        for &sample in &samples[skip..] {
            if self.len == capacity {
                self.head = (self.head + 1) % capacity;
                self.len -= 1;
                self.dropped += 1;
            }
            let tail = (self.head + self.len) % capacity;
            self.buffer[tail] = sample;
            self.len += 1;
        }
    }

    /// Move up to `out.len()` samples into `out`. Returns how many were written;
    /// the rest of `out` is left untouched.
    pub fn pop_into(&mut self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.len);
        let capacity = self.buffer.len();
        for (i, slot) in out.iter_mut().take(count).enumerate() {
            *slot = self.buffer[(self.head + i) % capacity];
        }
        self.head = (self.head + count) % capacity;
        self.len -= count;
        count
    }

    /// Discard up to `count` samples without copying them.
    pub fn skip(&mut self, count: usize) -> usize {
        let count = count.min(self.len);
        self.head = (self.head + count) % self.buffer.len();
        self.len -= count;
        count
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Samples discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
