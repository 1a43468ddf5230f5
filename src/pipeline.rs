use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Create a single-slot, latest-value channel.
///
/// The slot holds at most one value: a `send` replaces any unconsumed
/// value instead of queueing behind it, so a burst of events collapses
/// to the newest one. Senders never block, which keeps event-delivery
/// callbacks off the worker's back.
pub fn slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let shared = Arc::new(Shared {
        value: Mutex::new(None),
        notify: Notify::new(),
        senders: AtomicUsize::new(1),
    });
    (
        SlotSender {
            shared: Arc::clone(&shared),
        },
        SlotReceiver { shared },
    )
}

struct Shared<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
    senders: AtomicUsize,
}

/// Producing half of a slot. Cloneable; `send` never blocks.
pub struct SlotSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> SlotSender<T> {
    /// Publish a value, overwriting any value not yet consumed.
    pub fn send(&self, value: T) {
        *self.shared.value.lock().unwrap() = Some(value);
        self.shared.notify.notify_one();
    }
}

impl<T> Clone for SlotSender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for SlotSender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Wake the receiver so it can observe the closed slot.
            self.shared.notify.notify_one();
        }
    }
}

/// Consuming half of a slot, held by exactly one worker.
pub struct SlotReceiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> SlotReceiver<T> {
    /// Wait for the most recent unconsumed value.
    ///
    /// Returns `None` once every sender has been dropped and the slot
    /// is drained.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if let Some(value) = self.shared.value.lock().unwrap().take() {
                return Some(value);
            }
            if self.shared.senders.load(Ordering::Acquire) == 0 {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take the current value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.shared.value.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_coalesces_to_latest() {
        let (tx, mut rx) = slot();
        for position in 1..=5 {
            tx.send(position);
        }
        assert_eq!(rx.recv().await, Some(5));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn one_value_per_drain_cycle() {
        let (tx, mut rx) = slot();
        tx.send("a");
        tx.send("b");
        assert_eq!(rx.recv().await, Some("b"));

        tx.send("c");
        assert_eq!(rx.recv().await, Some("c"));
    }

    #[tokio::test]
    async fn recv_wakes_on_send() {
        let (tx, mut rx) = slot::<u32>();
        let worker = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        tx.send(7);
        assert_eq!(worker.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn closed_after_last_sender_dropped() {
        let (tx, mut rx) = slot();
        let tx2 = tx.clone();
        tx.send(1);
        drop(tx);
        drop(tx2);
        // The pending value is still delivered before close.
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn close_wakes_pending_receiver() {
        let (tx, mut rx) = slot::<u32>();
        let worker = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        drop(tx);
        assert_eq!(worker.await.unwrap(), None);
    }
}
