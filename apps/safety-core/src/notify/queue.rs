//! Bounded alert queue with priority-aware overflow.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::debug;

use super::request::NotificationRequest;

/// Concurrent queue with a nominal capacity.
///
/// At capacity, normal-priority messages are dropped; higher priorities are
/// always accepted — the queue grows past its nominal capacity rather than
/// lose a high-priority alert.
#[derive(Debug)]
pub struct AlertQueue {
    inner: Mutex<VecDeque<NotificationRequest>>,
    capacity: usize,
    notify: Notify,
}

impl AlertQueue {
    /// Create a queue with the given nominal capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Push a request, non-blocking. Returns whether it was accepted.
    pub fn push(&self, request: NotificationRequest) -> bool {
        {
            let mut inner = self.lock();
            if inner.len() >= self.capacity && request.priority.droppable() {
                debug!(key = %request.key, "Alert queue at capacity, normal-priority message dropped");
                return false;
            }
            inner.push_back(request);
        }
        self.notify.notify_one();
        true
    }

    /// Pop the oldest request, waiting until one is available.
    pub async fn pop(&self) -> NotificationRequest {
        loop {
            if let Some(request) = self.lock().pop_front() {
                return request;
            }
            self.notify.notified().await;
        }
    }

    /// Take every queued request, leaving the queue empty.
    #[must_use]
    pub fn drain(&self) -> Vec<NotificationRequest> {
        self.lock().drain(..).collect()
    }

    /// Current queue length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<NotificationRequest>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Priority;

    fn request(n: usize, priority: Priority) -> NotificationRequest {
        NotificationRequest::new(format!("k{n}"), "t", "m", priority)
    }

    #[test]
    fn test_normal_messages_dropped_at_capacity() {
        let queue = AlertQueue::new(3);
        for n in 0..5 {
            queue.push(request(n, Priority::Normal));
        }
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_high_priority_never_dropped() {
        let queue = AlertQueue::new(2);
        for n in 0..2 {
            assert!(queue.push(request(n, Priority::Normal)));
        }
        for n in 2..7 {
            assert!(queue.push(request(n, Priority::High)));
        }
        assert!(queue.push(request(7, Priority::Emergency)));
        // Grew past nominal capacity instead of dropping.
        assert_eq!(queue.len(), 8);
    }

    #[tokio::test]
    async fn test_pop_returns_fifo() {
        let queue = AlertQueue::new(4);
        queue.push(request(1, Priority::Normal));
        queue.push(request(2, Priority::High));

        assert_eq!(queue.pop().await.key, "k1");
        assert_eq!(queue.pop().await.key, "k2");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = std::sync::Arc::new(AlertQueue::new(4));
        let popper = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;
        queue.push(request(1, Priority::Normal));
        let popped = popper.await.unwrap();
        assert_eq!(popped.key, "k1");
    }
}
