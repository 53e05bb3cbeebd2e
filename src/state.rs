use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::messaging::MessagingProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub messaging: Box<dyn MessagingProvider>,
    pub user_locks: UserLocks,
}

/// Serializes turn processing per sender. Two messages from the same phone
/// number must never interleave, even when the transport retries delivery.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn for_sender(&self, phone: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.lock().unwrap();
        locks.entry(phone.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_sender_shares_a_lock() {
        let locks = UserLocks::default();
        let a = locks.for_sender("+15551110000");
        let b = locks.for_sender("+15551110000");
        let c = locks.for_sender("+15552220000");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
