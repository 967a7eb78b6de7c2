use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use marinecodec::Message;
use tokio::sync::Notify;

/// What travels along an observer edge: the canonical message plus, for
/// NMEA-decoded messages, the original line so same-family observers can
/// re-emit it byte for byte.
#[derive(Debug, Clone)]
pub struct Payload {
    pub message: Message,
    pub raw_nmea: Option<Arc<str>>,
}

impl Payload {
    pub fn new(message: Message) -> Self {
        Self { message, raw_nmea: None }
    }

    pub fn with_raw(message: Message, line: &str) -> Self {
        Self { message, raw_nmea: Some(Arc::from(line)) }
    }
}

struct QueuedItem {
    payload: Payload,
    enqueued_at: Instant,
}

/// Bounded FIFO with head-drop overflow and age-checked dequeue.
///
/// New items always get in: when the queue is full the oldest item is
/// dropped and counted. On dequeue, items older than `max_age` are dropped
/// silently and counted. Order within the queue is preserved, which gives
/// FIFO delivery per reader-to-observer edge.
pub struct TimedQueue {
    items: Mutex<VecDeque<QueuedItem>>,
    notify: Notify,
    capacity: usize,
    max_age: Duration,
    overflow_dropped: AtomicU64,
    expired_dropped: AtomicU64,
}

impl TimedQueue {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize, max_age: Duration) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            max_age,
            overflow_dropped: AtomicU64::new(0),
            expired_dropped: AtomicU64::new(0),
        })
    }

    /// Enqueues an item, dropping the oldest one when full.
    pub fn push(&self, payload: Payload) {
        {
            let mut items = self.items.lock().unwrap();
            if items.len() >= self.capacity {
                items.pop_front();
                self.overflow_dropped.fetch_add(1, Ordering::Relaxed);
            }
            items.push_back(QueuedItem { payload, enqueued_at: Instant::now() });
        }
        self.notify.notify_one();
    }

    /// Dequeues the next item younger than `max_age`, waiting if the queue
    /// is empty. Cancellation-safe: an item is only removed synchronously,
    /// never across an await point.
    pub async fn pop(&self) -> Payload {
        loop {
            {
                let mut items = self.items.lock().unwrap();
                while let Some(item) = items.pop_front() {
                    if item.enqueued_at.elapsed() > self.max_age {
                        self.expired_dropped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    return item.payload;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn overflow_dropped(&self) -> u64 {
        self.overflow_dropped.load(Ordering::Relaxed)
    }

    pub fn expired_dropped(&self) -> u64 {
        self.expired_dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(knots: f32) -> Payload {
        Payload::new(Message::SpeedThroughWater { knots })
    }

    #[tokio::test]
    async fn test_fifo_order_preserved() {
        let queue = TimedQueue::new(100, Duration::from_secs(30));
        for i in 0..50 {
            queue.push(msg(i as f32));
        }
        for i in 0..50 {
            let Message::SpeedThroughWater { knots } = queue.pop().await.message else { panic!() };
            assert_eq!(knots, i as f32);
        }
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let queue = TimedQueue::new(10, Duration::from_secs(30));
        for i in 0..200 {
            queue.push(msg(i as f32));
            assert!(queue.len() <= 10);
        }
        assert_eq!(queue.overflow_dropped(), 190);
        // The survivors are the newest ten, still in order.
        let Message::SpeedThroughWater { knots } = queue.pop().await.message else { panic!() };
        assert_eq!(knots, 190.0);
    }

    #[tokio::test]
    async fn test_expired_items_skipped_on_pop() {
        let queue = TimedQueue::new(100, Duration::from_millis(20));
        queue.push(msg(1.0));
        queue.push(msg(2.0));
        tokio::time::sleep(Duration::from_millis(40)).await;
        queue.push(msg(3.0));
        let Message::SpeedThroughWater { knots } = queue.pop().await.message else { panic!() };
        assert_eq!(knots, 3.0);
        assert_eq!(queue.expired_dropped(), 2);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = TimedQueue::new(10, Duration::from_secs(30));
        let popper = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(msg(7.0));
        let payload = popper.await.unwrap();
        let Message::SpeedThroughWater { knots } = payload.message else { panic!() };
        assert_eq!(knots, 7.0);
    }
}
