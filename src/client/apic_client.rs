//! API Connect management client
//!
//! Reqwest implementation of `ManagementClient`: bearer-token login,
//! multipart product publish, JSON product fetch and subscription creation.
//! TLS verification can be disabled for self-signed manager hosts; that is
//! an explicit opt-in, not the default.

use crate::core::error::PublishError;
use crate::core::traits::{ManagementClient, RemoteProduct, RemoteSubscription};
use crate::resolution::payload::StagedPayload;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP client for an API Connect style management service
pub struct ApiConnectClient {
    base_url: Url,
    http: reqwest::Client,
    token: Option<SecretString>,
}

impl ApiConnectClient {
    /// Create a client for the manager at `base_url`
    pub fn new(base_url: Url, insecure: bool) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| PublishError::AuthenticationFailure {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url,
            http,
            token: None,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PublishError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::AuthenticationFailure {
                message: format!("manager URL '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Publish endpoint for a catalog, or for a space within it
    pub fn publish_url(
        &self,
        organization: &str,
        catalog: &str,
        space: Option<&str>,
    ) -> Result<Url, PublishError> {
        match space {
            Some(space) => self.endpoint(&["api", "spaces", organization, catalog, space, "publish"]),
            None => self.endpoint(&["api", "catalogs", organization, catalog, "publish"]),
        }
    }

    /// Canonical URL of a published product by identity
    pub fn product_get_url(
        &self,
        organization: &str,
        catalog: &str,
        name: &str,
        version: &str,
    ) -> Result<Url, PublishError> {
        self.endpoint(&["api", "catalogs", organization, catalog, "products", name, version])
    }

    /// Canonical URL of a published product by its remote id
    pub fn product_id_url(
        &self,
        organization: &str,
        catalog: &str,
        product_id: &str,
    ) -> Result<Url, PublishError> {
        self.endpoint(&["api", "catalogs", organization, catalog, "products", product_id])
    }

    fn subscriptions_url(
        &self,
        organization: &str,
        catalog: &str,
        consumer_organization: &str,
        application: &str,
    ) -> Result<Url, PublishError> {
        self.endpoint(&[
            "api",
            "apps",
            organization,
            catalog,
            consumer_organization,
            application,
            "subscriptions",
        ])
    }

    fn bearer(&self) -> Result<&str, PublishError> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret())
            .ok_or_else(|| PublishError::AuthenticationFailure {
                message: "not logged in".to_string(),
            })
    }
}

/// Unwrap the manager's product body: some deployments wrap single results
/// in a `results` array, others return the product directly.
pub fn parse_product_body(body: serde_json::Value) -> Result<RemoteProduct, serde_json::Error> {
    let inner = match body {
        serde_json::Value::Object(ref map) if map.contains_key("results") => map
            .get("results")
            .and_then(|r| r.as_array())
            .and_then(|a| a.first())
            .cloned()
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
        other => other,
    };
    serde_json::from_value(inner)
}

#[async_trait]
impl ManagementClient for ApiConnectClient {
    async fn login(
        &mut self,
        username: &str,
        password: &SecretString,
        realm: &str,
    ) -> Result<(), PublishError> {
        let url = self.endpoint(&["api", "token"])?;

        let body = serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
            "realm": realm,
            "grant_type": "password",
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::AuthenticationFailure {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PublishError::AuthenticationFailure {
                message: format!("manager returned HTTP {}", response.status()),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| PublishError::AuthenticationFailure {
                    message: format!("malformed token response: {e}"),
                })?;

        self.token = Some(SecretString::new(token.access_token.into()));
        Ok(())
    }

    async fn publish(
        &self,
        organization: &str,
        catalog: &str,
        space: Option<&str>,
        payload: &StagedPayload,
    ) -> Result<RemoteProduct, PublishError> {
        let url = self.publish_url(organization, catalog, space)?;
        let token = self.bearer()?.to_string();

        let mut form = Form::new();
        for part in payload.parts() {
            let file_part = Part::bytes(part.content.clone())
                .file_name(part.file_name.clone())
                .mime_str(part.media_type)
                .map_err(|e| PublishError::PublishFailure {
                    message: format!("invalid media type {}: {e}", part.media_type),
                })?;
            form = form.part(part.field.as_str(), file_part);
        }

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::PublishFailure {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(PublishError::PublishFailure {
                message: format!("manager returned HTTP {status}: {detail}"),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| PublishError::PublishFailure {
                    message: format!("malformed publish response: {e}"),
                })?;

        parse_product_body(body).map_err(|e| PublishError::PublishFailure {
            message: format!("malformed publish response: {e}"),
        })
    }

    async fn get(
        &self,
        organization: &str,
        catalog: &str,
        name: &str,
        version: &str,
    ) -> Result<RemoteProduct, PublishError> {
        let url = self.product_get_url(organization, catalog, name, version)?;
        let token = self.bearer()?.to_string();

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|_| PublishError::VerificationFailure { state: None })?;

        if !response.status().is_success() {
            return Err(PublishError::VerificationFailure { state: None });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| PublishError::VerificationFailure { state: None })?;

        parse_product_body(body).map_err(|_| PublishError::VerificationFailure { state: None })
    }

    async fn subscribe(
        &self,
        product_url: &Url,
        organization: &str,
        catalog: &str,
        application: &str,
        plan: &str,
        consumer_organization: &str,
    ) -> Result<RemoteSubscription, PublishError> {
        let url =
            self.subscriptions_url(organization, catalog, consumer_organization, application)?;
        let token = self.bearer()?.to_string();

        let body = serde_json::json!({
            "product_url": product_url.as_str(),
            "plan": plan,
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::SubscriptionRequestFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PublishError::SubscriptionRequestFailed {
                message: format!("manager returned HTTP {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PublishError::SubscriptionRequestFailed {
                message: format!("malformed subscription response: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiConnectClient {
        ApiConnectClient::new(Url::parse("https://manager.example.com").unwrap(), false).unwrap()
    }

    #[test]
    fn test_publish_url_without_space() {
        let url = client().publish_url("acme", "sandbox", None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://manager.example.com/api/catalogs/acme/sandbox/publish"
        );
    }

    #[test]
    fn test_publish_url_with_space() {
        let url = client().publish_url("acme", "sandbox", Some("dev")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://manager.example.com/api/spaces/acme/sandbox/dev/publish"
        );
    }

    #[test]
    fn test_product_get_url() {
        let url = client()
            .product_get_url("acme", "sandbox", "orders-product", "1.0")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://manager.example.com/api/catalogs/acme/sandbox/products/orders-product/1.0"
        );
    }

    #[test]
    fn test_subscriptions_url() {
        let url = client()
            .subscriptions_url("acme", "sandbox", "consumers", "mobile-app")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://manager.example.com/api/apps/acme/sandbox/consumers/mobile-app/subscriptions"
        );
    }

    #[test]
    fn test_bearer_requires_login() {
        let err = client().bearer().unwrap_err();
        assert_eq!(err.code(), "AUTHENTICATION_FAILURE");
    }

    #[test]
    fn test_parse_product_body_direct() {
        let body = serde_json::json!({"id": "p1", "state": "published"});
        let product = parse_product_body(body).unwrap();
        assert_eq!(product.state.as_deref(), Some("published"));
    }

    #[test]
    fn test_parse_product_body_results_wrapper() {
        let body = serde_json::json!({"total_results": 1, "results": [{"id": "p1", "state": "staged"}]});
        let product = parse_product_body(body).unwrap();
        assert_eq!(product.id.as_deref(), Some("p1"));
        assert_eq!(product.state.as_deref(), Some("staged"));
    }

    #[test]
    fn test_parse_product_body_empty_results() {
        let body = serde_json::json!({"total_results": 0, "results": []});
        let product = parse_product_body(body).unwrap();
        assert_eq!(product.state, None);
    }
}
