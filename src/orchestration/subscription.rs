//! Subscription Manager
//!
//! Optional post-publish step: create an application-to-plan subscription
//! against the just-published product and verify it reached `enabled`.

use crate::core::config::{PublishSettings, SubscriptionSettings};
use crate::core::error::PublishError;
use crate::core::traits::{ManagementClient, RemoteProduct};
use tracing::info;
use url::Url;

/// Canonical URL identifying a published product by its remote id
pub fn product_canonical_url(
    base: &Url,
    organization: &str,
    catalog: &str,
    product_id: &str,
) -> Result<Url, PublishError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| PublishError::InvalidSettings {
            message: format!("manager URL '{base}' cannot carry a path"),
        })?
        .pop_if_empty()
        .extend(["api", "catalogs", organization, catalog, "products", product_id]);
    Ok(url)
}

/// Result of a verified subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionOutcome {
    pub application: String,
    pub plan: String,
    pub consumer_organization: String,
    pub subscription_id: Option<String>,
    pub state: String,
}

/// Creates and verifies the application-to-plan subscription
pub struct SubscriptionManager<'a> {
    settings: &'a PublishSettings,
    subscription: &'a SubscriptionSettings,
}

impl<'a> SubscriptionManager<'a> {
    pub fn new(
        settings: &'a PublishSettings,
        subscription: &'a SubscriptionSettings,
    ) -> Self {
        Self {
            settings,
            subscription,
        }
    }

    /// Subscribe the configured application to the published product
    ///
    /// Only the exact state `enabled` is accepted; anything else, including
    /// an absent state, fails the run.
    pub async fn subscribe(
        &self,
        client: &dyn ManagementClient,
        product: &RemoteProduct,
    ) -> Result<SubscriptionOutcome, PublishError> {
        let product_id = product
            .id
            .as_deref()
            .ok_or_else(|| PublishError::SubscriptionRequestFailed {
                message: "published product has no id".to_string(),
            })?;

        let base = self.settings.manager_base_url()?;
        let product_url = product_canonical_url(
            &base,
            &self.settings.organization,
            &self.settings.catalog,
            product_id,
        )?;

        info!(product_url = %product_url, application = %self.subscription.application,
              plan = %self.subscription.plan, "creating subscription");

        let result = client
            .subscribe(
                &product_url,
                &self.settings.organization,
                &self.settings.catalog,
                &self.subscription.application,
                &self.subscription.plan,
                &self.subscription.consumer_organization,
            )
            .await?;

        match result.state.as_deref() {
            Some("enabled") => Ok(SubscriptionOutcome {
                application: self.subscription.application.clone(),
                plan: self.subscription.plan.clone(),
                consumer_organization: self.subscription.consumer_organization.clone(),
                subscription_id: result.id,
                state: "enabled".to_string(),
            }),
            other => Err(PublishError::SubscriptionFailure {
                state: other.map(str::to_string),
            }),
        }
    }
}

impl SubscriptionOutcome {
    /// Human-readable fragment for the final summary line
    pub fn summary(&self) -> String {
        format!(
            "subscribed application '{}' to plan '{}' for consumer organization '{}'",
            self.application, self.plan, self.consumer_organization
        )
    }
}
