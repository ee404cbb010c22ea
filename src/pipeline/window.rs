/// Rolling span of mono samples awaiting inference.
///
/// Grows by block concatenation on the front of each cycle and is truncated
/// from the front after every triggered cycle, so consecutive inference
/// windows overlap by `buffer - slide` seconds. Owned exclusively by the
/// processing loop; there is no concurrent access.
#[derive(Debug, Default)]
pub struct SlideWindow {
    samples: Vec<f32>,
}

impl SlideWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one mono block, preserving arrival order.
    pub fn push_block(&mut self, block: &[f32]) {
        self.samples.extend_from_slice(block);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mean absolute amplitude across the whole window; 0.0 when empty.
    pub fn mean_abs(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s.abs()).sum();
        sum / self.samples.len() as f32
    }

    /// Drop the oldest `count` samples, clamped so the window never goes
    /// negative-length.
    pub fn slide(&mut self, count: usize) {
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
    }
}
