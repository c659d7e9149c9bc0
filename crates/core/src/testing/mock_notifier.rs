//! Mock notifier for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::notify::{Notifier, NotifyError};

/// Mock notifier that records deliveries and can be told to fail.
#[derive(Clone, Default)]
pub struct MockNotifier {
    fail: Arc<AtomicBool>,
    delivered: Arc<Mutex<Vec<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail with a transport error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Request ids delivered so far, in order.
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, request_id: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("mock endpoint unreachable".to_string()));
        }
        self.delivered.lock().unwrap().push(request_id.to_string());
        Ok(())
    }
}
