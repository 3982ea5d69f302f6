//! Workflow settings for the product publisher
//!
//! Settings are acquired by the binary (CLI flags doubling as the action's
//! `INPUT_*` environment variables) and passed down as one value; no module
//! reads the environment on its own.

use crate::core::error::PublishError;
use secrecy::SecretString;
use std::path::PathBuf;
use url::Url;

/// Identifiers for the optional post-publish subscription step
#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    /// Application to subscribe
    pub application: String,

    /// Plan the application subscribes to
    pub plan: String,

    /// Tenant on whose behalf the subscription is created
    pub consumer_organization: String,
}

/// Complete configuration for one publish run
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Path to the product descriptor file
    pub product_file: PathBuf,

    /// Manager hostname, with or without an https:// scheme
    pub manager_host: String,

    /// Operator username
    pub username: String,

    /// Operator password; never logged
    pub password: SecretString,

    /// Authentication realm
    pub realm: String,

    /// Provider organization
    pub organization: String,

    /// Target catalog
    pub catalog: String,

    /// Optional sub-partition within the catalog. Passed through verbatim;
    /// no whitespace trimming is applied.
    pub space: Option<String>,

    /// Skip TLS certificate verification (self-signed manager hosts)
    pub insecure: bool,

    /// Truncate reference filenames at the first underscore before lookup
    pub normalize_ref_names: bool,

    /// When set, the workflow subscribes after a verified publish
    pub subscription: Option<SubscriptionSettings>,
}

impl PublishSettings {
    /// Base URL of the management service
    pub fn manager_base_url(&self) -> Result<Url, PublishError> {
        let raw = if self.manager_host.contains("://") {
            self.manager_host.clone()
        } else {
            format!("https://{}", self.manager_host)
        };

        Url::parse(&raw).map_err(|e| PublishError::InvalidSettings {
            message: format!("invalid manager host '{}': {}", self.manager_host, e),
        })
    }

    /// Check the settings are internally consistent before the workflow starts
    pub fn validate(&self) -> Result<(), PublishError> {
        if self.manager_host.trim().is_empty() {
            return Err(PublishError::InvalidSettings {
                message: "manager host is empty".to_string(),
            });
        }

        if let Some(sub) = &self.subscription {
            let missing = [
                ("application", &sub.application),
                ("plan", &sub.plan),
                ("consumer organization", &sub.consumer_organization),
            ]
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| *k)
            .collect::<Vec<_>>();

            if !missing.is_empty() {
                return Err(PublishError::InvalidSettings {
                    message: format!("subscription requested but missing {}", missing.join(", ")),
                });
            }
        }

        Ok(())
    }
}
