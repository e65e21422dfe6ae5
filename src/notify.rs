//! Device-notification side effects that ride along with logout.

use async_trait::async_trait;

use crate::errors::Error;

/// Platform notification surface the coordinator cleans up on logout.
/// Every hook is best-effort; failures are logged and never block the
/// session transition.
#[async_trait]
pub trait NotificationHooks: Send + Sync {
    /// Reset the app badge count.
    async fn clear_badge(&self) -> Result<(), Error>;
    /// Drop all locally scheduled notifications.
    async fn cancel_scheduled(&self) -> Result<(), Error>;
    /// Unregister the device push token from the backend.
    async fn unregister_push(&self) -> Result<(), Error>;
}

/// No-op hooks for hosts without a notification surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifications;

#[async_trait]
impl NotificationHooks for NoopNotifications {
    async fn clear_badge(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn cancel_scheduled(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn unregister_push(&self) -> Result<(), Error> {
        Ok(())
    }
}
