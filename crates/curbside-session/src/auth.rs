//! Auth collaborator consumed by the monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};

// ============================================================================
// AuthProvider Trait
// ============================================================================

/// Credential operations the monitor delegates to the auth backend.
#[async_trait]
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    /// Invalidate the current credential.
    async fn sign_out(&self) -> Result<()>;

    /// Try to extend the current session.
    ///
    /// Failure is reported through the `Err` variant; the monitor turns it
    /// into `false` rather than propagating it.
    async fn refresh_credential(&self) -> Result<()>;
}

/// Shared auth provider handle.
pub type SharedAuthProvider = Arc<dyn AuthProvider>;

// ============================================================================
// InMemoryAuth (for testing and local hosts)
// ============================================================================

/// In-memory auth provider that records calls.
#[derive(Debug)]
pub struct InMemoryAuth {
    signed_in: AtomicBool,
    refresh_succeeds: AtomicBool,
    sign_out_count: AtomicU32,
    refresh_count: AtomicU32,
}

impl InMemoryAuth {
    /// A signed-in session whose refreshes succeed.
    pub fn new() -> Self {
        Self {
            signed_in: AtomicBool::new(true),
            refresh_succeeds: AtomicBool::new(true),
            sign_out_count: AtomicU32::new(0),
            refresh_count: AtomicU32::new(0),
        }
    }

    /// Control whether subsequent refreshes succeed.
    pub fn set_refresh_succeeds(&self, succeeds: bool) {
        self.refresh_succeeds.store(succeeds, Ordering::SeqCst);
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    pub fn sign_out_count(&self) -> u32 {
        self.sign_out_count.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_count.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_out(&self) -> Result<()> {
        self.sign_out_count.fetch_add(1, Ordering::SeqCst);
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_credential(&self) -> Result<()> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        if !self.is_signed_in() {
            return Err(Error::Auth("not signed in".to_string()));
        }
        if self.refresh_succeeds.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Auth("credential refresh rejected".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_after_sign_out_fails() {
        let auth = InMemoryAuth::new();
        assert!(auth.refresh_credential().await.is_ok());

        auth.sign_out().await.unwrap();
        assert!(!auth.is_signed_in());
        assert!(matches!(auth.refresh_credential().await, Err(Error::Auth(_))));
        assert_eq!(auth.refresh_count(), 2);
        assert_eq!(auth.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh() {
        let auth = InMemoryAuth::new();
        auth.set_refresh_succeeds(false);
        assert!(auth.refresh_credential().await.is_err());
    }
}
