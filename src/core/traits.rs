//! Core trait and remote value types for the publish workflow
//!
//! The management API is an opaque transport behind the `ManagementClient`
//! trait; everything it returns is a value snapshot, never live state.

use crate::core::error::PublishError;
use crate::resolution::payload::StagedPayload;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Remote representation of a published product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Lifecycle state as reported by the manager ("staged", "published", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Remote representation of an application-to-plan subscription
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteSubscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Subscription state as reported by the manager ("pending", "enabled", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Opaque transport to the API-lifecycle-management service
///
/// Implementations own connection details (tokens, TLS policy); callers see
/// four blocking-until-response operations and nothing else.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Authenticate with operator credentials against a realm
    async fn login(
        &mut self,
        username: &str,
        password: &SecretString,
        realm: &str,
    ) -> Result<(), PublishError>;

    /// Submit the staged multi-part payload for an organization/catalog
    async fn publish(
        &self,
        organization: &str,
        catalog: &str,
        space: Option<&str>,
        payload: &StagedPayload,
    ) -> Result<RemoteProduct, PublishError>;

    /// Re-fetch a product by identity to read back its current state
    async fn get(
        &self,
        organization: &str,
        catalog: &str,
        name: &str,
        version: &str,
    ) -> Result<RemoteProduct, PublishError>;

    /// Create an application-to-plan subscription against a published product
    async fn subscribe(
        &self,
        product_url: &Url,
        organization: &str,
        catalog: &str,
        application: &str,
        plan: &str,
        consumer_organization: &str,
    ) -> Result<RemoteSubscription, PublishError>;
}
