//! External collaborator seams

use async_trait::async_trait;

use super::errors::NotifyResult;
use super::request::NotificationRequest;
use crate::profile::Profile;

/// Supplies profiles for re-evaluation.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// `None` when the user no longer exists.
    async fn get_profile(&self, user_id: &str) -> NotifyResult<Option<Profile>>;

    /// A finite, lazy pass over every profile. Each call starts over.
    fn stream_profiles(&self) -> Box<dyn Iterator<Item = Profile> + Send + '_>;
}

/// Delivers notification requests. Channel selection is the sink's concern.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> NotifyResult<()>;
}
