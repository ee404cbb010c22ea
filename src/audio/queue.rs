//! Hand-off point between the capture callback and the processing loop.
//!
//! The channel is the only state shared between the two contexts. Pushes come
//! from the audio driver's callback thread and must never block; drains come
//! from the single processing context and must never wait for data. The
//! channel is unbounded, so a processing side that falls behind grows the
//! queue rather than back-pressuring the audio driver.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Create the capture-to-processing block channel.
pub fn block_channel() -> (BlockSender, BlockReceiver) {
    let (sender, receiver) = unbounded::<Vec<f32>>();
    (
        BlockSender {
            inner: sender,
            dropped: Arc::new(AtomicUsize::new(0)),
        },
        BlockReceiver { inner: receiver },
    )
}

/// Capture-side handle. Safe to use from the audio callback.
#[derive(Clone)]
pub struct BlockSender {
    inner: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl BlockSender {
    /// Push a mono block without blocking. A send on an unbounded channel
    /// cannot wait; a disconnected receiver is counted and swallowed so
    /// nothing propagates into the audio driver.
    pub fn push(&self, block: Vec<f32>) {
        if self.inner.send(block).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Blocks discarded because the processing side went away.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Processing-side handle. Owned by the single processing context.
pub struct BlockReceiver {
    inner: Receiver<Vec<f32>>,
}

impl BlockReceiver {
    /// Iterate over every currently-available block without waiting for more.
    pub fn try_iter(&self) -> impl Iterator<Item = Vec<f32>> + '_ {
        self.inner.try_iter()
    }

    /// Number of blocks waiting to be drained.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_blocks_in_arrival_order() {
        let (sender, receiver) = block_channel();
        sender.push(vec![1.0]);
        sender.push(vec![2.0]);
        sender.push(vec![3.0]);

        let drained: Vec<Vec<f32>> = receiver.try_iter().collect();
        assert_eq!(drained, vec![vec![1.0], vec![2.0], vec![3.0]]);
        assert!(receiver.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_returns_nothing() {
        let (_sender, receiver) = block_channel();
        assert_eq!(receiver.try_iter().count(), 0);
    }

    #[test]
    fn push_after_receiver_dropped_is_counted_not_fatal() {
        let (sender, receiver) = block_channel();
        drop(receiver);
        sender.push(vec![0.0]);
        sender.push(vec![0.0]);
        assert_eq!(sender.dropped(), 2);
    }
}
