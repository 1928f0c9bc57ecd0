//! # Session Provider
//!
//! Holds the signed-in user (if any) and publishes every change on a watch
//! channel so the workspace can re-scope its collections.
//!
//! Authentication itself happens elsewhere; this module only records the
//! outcome. The development bypass signs in a fixed user without
//! credentials, and only when both the stored toggle and the configuration
//! allow it.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::AuthConfig;
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Signed in through the development bypass
    #[serde(default)]
    pub dev_bypass: bool,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            dev_bypass: false,
        }
    }
}

pub struct SessionManager {
    sender: watch::Sender<Option<Session>>,
    kv: Arc<dyn KeyValueStore>,
    auth: AuthConfig,
}

impl SessionManager {
    pub fn new(kv: Arc<dyn KeyValueStore>, auth: AuthConfig) -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender, kv, auth }
    }

    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }

    pub fn sign_in(&self, session: Session) {
        info!("Signed in as {}", session.user_id);
        self.sender.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if self.sender.send_replace(None).is_some() {
            info!("Signed out");
        }
        if self.kv.get(keys::DEV_AUTH_BYPASS).is_some() {
            if let Err(e) = self.kv.remove(keys::DEV_AUTH_BYPASS) {
                warn!("Failed to clear development bypass flag: {}", e);
            }
        }
    }

    fn bypass_requested(&self) -> bool {
        self.kv.get(keys::DEV_AUTH_BYPASS).as_deref() == Some("true")
    }

    /// Restore a bypass session if it is both requested and allowed. Returns
    /// the session that is now current.
    pub fn restore(&self) -> Option<Session> {
        if self.bypass_requested() {
            if self.auth.dev_bypass_allowed {
                let session = Session {
                    dev_bypass: true,
                    ..Session::new(self.auth.dev_user_id.clone())
                };
                self.sign_in(session);
            } else {
                warn!("Development bypass requested but not allowed by configuration");
            }
        }
        self.current()
    }

    /// Turn the development bypass on and sign in through it
    pub fn enable_dev_bypass(&self) -> anyhow::Result<Option<Session>> {
        if !self.auth.dev_bypass_allowed {
            anyhow::bail!("development bypass is disabled in this configuration");
        }
        self.kv.set(keys::DEV_AUTH_BYPASS, "true")?;
        Ok(self.restore())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn manager(allowed: bool) -> (SessionManager, Arc<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let auth = AuthConfig {
            dev_bypass_allowed: allowed,
            dev_user_id: "dev-user".to_string(),
        };
        (SessionManager::new(kv.clone(), auth), kv)
    }

    #[tokio::test]
    async fn test_sign_in_and_out_are_published() {
        let (sessions, _) = manager(false);
        let mut watcher = sessions.watch();
        assert_eq!(sessions.current(), None);

        sessions.sign_in(Session::new("user-1"));
        watcher.changed().await.unwrap();
        assert_eq!(
            watcher.borrow_and_update().as_ref().map(|s| s.user_id.clone()),
            Some("user-1".to_string())
        );

        sessions.sign_out();
        watcher.changed().await.unwrap();
        assert_eq!(*watcher.borrow(), None);
    }

    #[test]
    fn test_bypass_requires_flag_and_configuration() {
        let (sessions, kv) = manager(false);
        kv.set(keys::DEV_AUTH_BYPASS, "true").unwrap();
        assert_eq!(sessions.restore(), None);
        assert!(sessions.enable_dev_bypass().is_err());

        let (sessions, kv) = manager(true);
        assert_eq!(sessions.restore(), None);
        kv.set(keys::DEV_AUTH_BYPASS, "yes").unwrap();
        assert_eq!(sessions.restore(), None);

        kv.set(keys::DEV_AUTH_BYPASS, "true").unwrap();
        let session = sessions.restore().unwrap();
        assert_eq!(session.user_id, "dev-user");
        assert!(session.dev_bypass);
    }

    #[test]
    fn test_sign_out_clears_bypass_flag() {
        let (sessions, kv) = manager(true);
        sessions.enable_dev_bypass().unwrap();
        assert!(sessions.current().is_some());

        sessions.sign_out();
        assert_eq!(sessions.current(), None);
        assert_eq!(kv.get(keys::DEV_AUTH_BYPASS), None);
    }
}
