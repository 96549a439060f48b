//! Bounded FIFO between the producer and one analysis consumer
//!
//! Built on a bounded `tokio::sync::mpsc` channel plus an explicit closed
//! state. `push`, `pop` and `close` are the whole synchronization surface.

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::QueueError;
use crate::domain::model::{MediaUnit, StreamKind};

/// Default queue depth per stream
pub const DEFAULT_QUEUE_CAPACITY: usize = 2048;

/// Fixed-capacity queue of decoded units for one stream kind
#[derive(Debug)]
pub struct BoundedFrameQueue {
    kind: StreamKind,
    capacity: usize,
    tx: mpsc::Sender<MediaUnit>,
    rx: Mutex<mpsc::Receiver<MediaUnit>>,
    closed: CancellationToken,
}

impl BoundedFrameQueue {
    /// Create a queue; a capacity of zero is raised to one
    pub fn new(kind: StreamKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            kind,
            capacity,
            tx,
            rx: Mutex::new(rx),
            closed: CancellationToken::new(),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units currently buffered (including pushes that hold a slot)
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Append a unit, waiting while the queue is full
    ///
    /// Fails with [`QueueError::QueueClosed`] when the queue is closed before
    /// or while waiting; the unit is dropped in that case.
    pub async fn push(&self, unit: MediaUnit) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::QueueClosed);
        }

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(QueueError::QueueClosed),
            sent = self.tx.send(unit) => sent.map_err(|_| QueueError::QueueClosed),
        }
    }

    /// Take the oldest unit, waiting while the queue is empty and open
    ///
    /// Once closed, buffered units are still returned in order; after the
    /// last one every call yields [`QueueError::EndOfQueue`].
    pub async fn pop(&self) -> Result<MediaUnit, QueueError> {
        let mut rx = self.rx.lock().await;

        if !self.closed.is_cancelled() {
            tokio::select! {
                biased;
                unit = rx.recv() => return unit.ok_or(QueueError::EndOfQueue),
                _ = self.closed.cancelled() => {}
            }
        }

        // Refuse pushes racing with the close, then drain what made it in
        rx.close();
        rx.recv().await.ok_or(QueueError::EndOfQueue)
    }

    /// Close the queue; idempotent, wakes every waiting push and pop
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// [`push`](Self::push) from a blocking thread inside the runtime
    pub fn blocking_push(&self, handle: &Handle, unit: MediaUnit) -> Result<(), QueueError> {
        handle.block_on(self.push(unit))
    }

    /// [`pop`](Self::pop) from a blocking thread inside the runtime
    pub fn blocking_pop(&self, handle: &Handle) -> Result<MediaUnit, QueueError> {
        handle.block_on(self.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TimeSpec;
    use std::sync::Arc;
    use std::time::Duration;

    fn unit(index: u64) -> MediaUnit {
        MediaUnit::audio(TimeSpec::from_seconds(index as f64), 8000, 1, vec![0.0; 4])
    }

    #[tokio::test]
    async fn test_fifo_with_small_capacity() {
        let queue = Arc::new(BoundedFrameQueue::new(StreamKind::Audio, 4));
        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for i in 0..100 {
                    queue.push(unit(i)).await.unwrap();
                }
                queue.close();
            })
        };

        let mut seen = Vec::new();
        while let Ok(unit) = queue.pop().await {
            assert!(queue.len() <= queue.capacity());
            seen.push(unit.pts.seconds as u64);
        }
        producer.await.unwrap();

        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_close_drains_remaining_items() {
        let queue = BoundedFrameQueue::new(StreamKind::Video, 8);
        for i in 0..3 {
            queue.push(unit(i)).await.unwrap();
        }
        queue.close();
        queue.close();

        for i in 0..3 {
            assert_eq!(queue.pop().await.unwrap().pts.seconds as u64, i);
        }
        for _ in 0..3 {
            assert_eq!(queue.pop().await, Err(QueueError::EndOfQueue));
        }
    }

    #[tokio::test]
    async fn test_close_empty_queue() {
        let queue = BoundedFrameQueue::new(StreamKind::Video, 8);
        queue.close();
        assert_eq!(queue.pop().await, Err(QueueError::EndOfQueue));
    }

    #[tokio::test]
    async fn test_push_after_close_fails() {
        let queue = BoundedFrameQueue::new(StreamKind::Audio, 2);
        assert!(!queue.is_closed());
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.push(unit(0)).await, Err(QueueError::QueueClosed));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_close_wakes_blocked_push() {
        let queue = Arc::new(BoundedFrameQueue::new(StreamKind::Audio, 1));
        queue.push(unit(0)).await.unwrap();

        let blocked = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.push(unit(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        queue.close();
        let result = tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .expect("push stayed blocked after close")
            .unwrap();
        assert_eq!(result, Err(QueueError::QueueClosed));

        // The unit that was already queued survives the close
        assert_eq!(queue.pop().await.unwrap().pts.seconds, 0.0);
        assert_eq!(queue.pop().await, Err(QueueError::EndOfQueue));
    }

    #[tokio::test]
    async fn test_close_wakes_blocked_pop() {
        let queue = Arc::new(BoundedFrameQueue::new(StreamKind::Video, 4));
        let waiting = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.close();
        let result = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("pop stayed blocked after close")
            .unwrap();
        assert_eq!(result, Err(QueueError::EndOfQueue));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_helpers_from_blocking_threads() {
        let queue = Arc::new(BoundedFrameQueue::new(StreamKind::Audio, 2));
        let handle = Handle::current();

        let producer = {
            let queue = Arc::clone(&queue);
            let handle = handle.clone();
            tokio::task::spawn_blocking(move || {
                for i in 0..20 {
                    queue.blocking_push(&handle, unit(i)).unwrap();
                }
                queue.close();
            })
        };
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::task::spawn_blocking(move || {
                let mut count = 0;
                while queue.blocking_pop(&handle).is_ok() {
                    count += 1;
                }
                count
            })
        };

        producer.await.unwrap();
        assert_eq!(consumer.await.unwrap(), 20);
    }
}
