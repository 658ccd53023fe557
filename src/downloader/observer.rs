use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

type Callback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// 订阅者列表。回调拿到的总是调用方准备好的快照副本。
pub struct ObserverBus<T> {
    observers: Arc<DashMap<u64, Callback<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for ObserverBus<T> {
    fn default() -> Self {
        Self {
            observers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: Send + Sync + 'static> ObserverBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // 注册后立即推送一次当前快照
    pub fn subscribe<F>(&self, current: &[T], callback: F) -> Subscription
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback<T> = Arc::new(callback);
        self.observers.insert(id, Arc::clone(&callback));
        callback(current);

        let observers = Arc::downgrade(&self.observers);
        Subscription {
            detach: Box::new(move || {
                if let Some(observers) = Weak::upgrade(&observers) {
                    observers.remove(&id);
                }
            }),
        }
    }

    pub fn publish(&self, snapshot: &[T]) {
        if self.is_empty() {
            return;
        }
        // 先取出回调再调用，回调里可以安全地订阅/取消订阅
        let callbacks: Vec<Callback<T>> = self
            .observers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        debug!("通知 {} 个订阅者", callbacks.len());
        for callback in callbacks {
            callback(snapshot);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// 取消订阅的句柄
pub struct Subscription {
    detach: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.detach)();
    }
}
