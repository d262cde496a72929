//! The Messaging collaborator boundary (§1, §5 non-goals): this engine only
//! decides *that* a listing should reach a user, never *how* it is rendered
//! or delivered. Chat-bot conversation flow, localization catalogs and the
//! AI narrative generator all live on the other side of this trait.

use async_trait::async_trait;

use aptwatch_types::{IngestError, Listing};

use crate::entities::Language;

/// Outbound delivery contract implemented by whatever sits on the other
/// side of the notification boundary (a chat bot, an email sender, a push
/// notification service...).
#[async_trait]
pub trait MessagingSender: Send + Sync {
    /// Deliver a single listing notification to `user_id` in `language`.
    async fn send_listing(
        &self,
        user_id: &str,
        listing: &Listing,
        language: Language,
    ) -> Result<(), IngestError>;

    /// Deliver a pre-rendered AI narrative alongside a listing, when the
    /// optional narrative feature is enabled upstream. Implementations that
    /// don't support narratives may fall back to [`Self::send_listing`].
    async fn send_ai_narrative(
        &self,
        user_id: &str,
        listing: &Listing,
        narrative: &str,
        language: Language,
    ) -> Result<(), IngestError>;
}

/// No-op sender used by tests and by deployments that only want to exercise
/// the scheduling/matching pipeline without a real delivery channel.
#[derive(Debug, Default)]
pub struct NullMessagingSender;

#[async_trait]
impl MessagingSender for NullMessagingSender {
    async fn send_listing(
        &self,
        _user_id: &str,
        _listing: &Listing,
        _language: Language,
    ) -> Result<(), IngestError> {
        Ok(())
    }

    async fn send_ai_narrative(
        &self,
        _user_id: &str,
        _listing: &Listing,
        _narrative: &str,
        _language: Language,
    ) -> Result<(), IngestError> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A sender that fails delivery for one specific user id and succeeds
    /// for everyone else, used to exercise per-candidate failure tolerance
    /// in the dispatcher without aborting the rest of a batch.
    pub(crate) struct FailingMessagingSender {
        failing_user_id: String,
    }

    impl FailingMessagingSender {
        pub(crate) fn new(failing_user_id: impl Into<String>) -> Self {
            Self {
                failing_user_id: failing_user_id.into(),
            }
        }
    }

    #[async_trait]
    impl MessagingSender for FailingMessagingSender {
        async fn send_listing(
            &self,
            user_id: &str,
            _listing: &Listing,
            _language: Language,
        ) -> Result<(), IngestError> {
            if user_id == self.failing_user_id {
                Err(IngestError::Delivery {
                    user_id: user_id.to_string(),
                    msg: "simulated delivery failure".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn send_ai_narrative(
            &self,
            _user_id: &str,
            _listing: &Listing,
            _narrative: &str,
            _language: Language,
        ) -> Result<(), IngestError> {
            Ok(())
        }
    }
}
