//! Event queue: unbounded multi-producer / single-consumer FIFO.
//!
//! Backed by `tokio::sync::mpsc::unbounded_channel`, used from plain threads:
//! `send` and `try_recv` never block and need no runtime. The sender half is
//! cloned into every client; the receiver half is owned by the worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use metricq_core::MetricEvent;

/// Create a connected queue pair.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        EventSender {
            tx,
            pending: Arc::clone(&pending),
        },
        EventReceiver { rx, pending },
    )
}

/// Producer half. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<MetricEvent>,
    pending: Arc<AtomicUsize>,
}

impl EventSender {
    /// Enqueue without blocking. Returns false if the consumer is gone, in
    /// which case the event is dropped.
    pub fn push(&self, event: MetricEvent) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                self.pending.fetch_sub(1, Ordering::Relaxed);
                tracing::debug!(event = %event, "event queue closed; dropping event");
                false
            }
        }
    }

    /// Events enqueued but not yet dequeued.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<MetricEvent>,
    pending: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Next event in enqueue order, or `None` immediately if the queue is empty.
    pub fn try_dequeue(&mut self) -> Option<MetricEvent> {
        match self.rx.try_recv() {
            Ok(event) => {
                self.pending.fetch_sub(1, Ordering::Relaxed);
                Some(event)
            }
            Err(mpsc::error::TryRecvError::Empty) | Err(mpsc::error::TryRecvError::Disconnected) => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricq_core::LabelSet;

    #[test]
    fn fifo_and_nonblocking() {
        let (tx, mut rx) = channel();
        assert!(rx.try_dequeue().is_none());

        for i in 0..3 {
            assert!(tx.push(MetricEvent::gauge_set("g", i as f64, LabelSet::new())));
        }
        assert_eq!(tx.pending(), 3);

        let got: Vec<_> = std::iter::from_fn(|| rx.try_dequeue()).collect();
        let expected: Vec<_> = (0..3)
            .map(|i| MetricEvent::gauge_set("g", i as f64, LabelSet::new()))
            .collect();
        assert_eq!(got, expected);
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn push_after_receiver_dropped_is_dropped() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(!tx.push(MetricEvent::counter_inc("c", 1.0, LabelSet::new())));
        assert_eq!(tx.pending(), 0);
    }

    #[test]
    fn concurrent_producers() {
        let (tx, mut rx) = channel();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        tx.push(MetricEvent::counter_inc("c", 1.0, LabelSet::new()));
                    }
                })
            })
            .collect();
        for h in handles {
            let _ = h.join();
        }
        assert_eq!(std::iter::from_fn(|| rx.try_dequeue()).count(), 400);
    }
}
