//! Publish Orchestrator
//!
//! Drives the whole run as one linear sequence: load and resolve the
//! descriptor, stage the payload, then login -> publish -> verify ->
//! (subscribe). Every step blocks on the previous one's output; a single
//! failed attempt fails the entire run, with no retries anywhere.

use crate::core::config::PublishSettings;
use crate::core::error::PublishError;
use crate::core::state_machine::{WorkflowState, WorkflowStateMachine};
use crate::core::traits::ManagementClient;
use crate::orchestration::subscription::{SubscriptionManager, SubscriptionOutcome};
use crate::resolution::descriptor::ProductDescriptor;
use crate::resolution::payload::PayloadBuilder;
use crate::resolution::resolver::{RefNamePolicy, ReferenceResolver};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Report returned after a fully verified run
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub product_name: String,
    pub product_version: String,
    pub product_title: Option<String>,
    pub catalog: String,
    pub space: Option<String>,
    /// Final remote state; always "published" on success
    pub state: String,
    pub subscription: Option<SubscriptionOutcome>,
    pub duration_ms: u64,
}

impl PublishReport {
    /// The final human-readable summary line
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Published '{}' version {} to catalog '{}'",
            self.product_name, self.product_version, self.catalog
        );
        if let Some(space) = &self.space {
            line.push_str(&format!(" (space '{space}')"));
        }
        if let Some(subscription) = &self.subscription {
            line.push_str("; ");
            line.push_str(&subscription.summary());
        }
        line
    }
}

/// Main orchestrator for one publish run
pub struct ProductPublisher<'a> {
    settings: &'a PublishSettings,
    client: &'a mut dyn ManagementClient,
    state_machine: WorkflowStateMachine,
}

impl<'a> ProductPublisher<'a> {
    pub fn new(settings: &'a PublishSettings, client: &'a mut dyn ManagementClient) -> Self {
        Self {
            settings,
            client,
            state_machine: WorkflowStateMachine::new(),
        }
    }

    /// Current workflow state
    pub fn state(&self) -> WorkflowState {
        self.state_machine.current()
    }

    /// Run the workflow to completion
    pub async fn run(&mut self) -> Result<PublishReport, PublishError> {
        match self.execute().await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.state_machine.fail();
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<PublishReport, PublishError> {
        let start = Instant::now();
        self.settings.validate()?;

        // Resolve the descriptor into a self-contained payload
        let mut product = ProductDescriptor::from_file(&self.settings.product_file)?;
        let product_dir = self
            .settings
            .product_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let policy = RefNamePolicy::from_flag(self.settings.normalize_ref_names);
        let resolver = ReferenceResolver::new(product_dir, policy);
        let resolved = resolver.resolve(&mut product)?;

        let payload = PayloadBuilder::stage(&product, &resolved)?;

        // Login
        self.client
            .login(
                &self.settings.username,
                &self.settings.password,
                &self.settings.realm,
            )
            .await?;
        self.state_machine.transition(WorkflowState::Authenticated)?;
        info!(host = %self.settings.manager_host, "logged in to the manager");

        // Publish; artifact handles are released right after the call
        let published = self
            .client
            .publish(
                &self.settings.organization,
                &self.settings.catalog,
                self.settings.space.as_deref(),
                &payload,
            )
            .await?;
        drop(payload);
        self.state_machine.transition(WorkflowState::Published)?;
        info!(catalog = %self.settings.catalog, "published the product");

        // Verify: re-fetch by identity and require the exact terminal state
        let fetched = self
            .client
            .get(
                &self.settings.organization,
                &self.settings.catalog,
                &product.info.name,
                &product.info.version,
            )
            .await?;

        if fetched.state.as_deref() != Some("published") {
            return Err(PublishError::VerificationFailure {
                state: fetched.state.clone(),
            });
        }
        self.state_machine.transition(WorkflowState::Verified)?;
        info!(state = "published", "checked the product");

        // Optional subscription step
        let subscription = match &self.settings.subscription {
            Some(sub_settings) => {
                let mut target = fetched.clone();
                if target.id.is_none() {
                    target.id = published.id.clone();
                }

                let manager = SubscriptionManager::new(self.settings, sub_settings);
                let outcome = manager.subscribe(&*self.client, &target).await?;
                self.state_machine.transition(WorkflowState::Subscribed)?;
                Some(outcome)
            }
            None => None,
        };

        self.state_machine.transition(WorkflowState::Done)?;

        Ok(PublishReport {
            product_name: product.info.name.clone(),
            product_version: product.info.version.clone(),
            product_title: product.info.title.clone(),
            catalog: self.settings.catalog.clone(),
            space: self.settings.space.clone(),
            state: "published".to_string(),
            subscription,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SubscriptionSettings;
    use crate::core::traits::{RemoteProduct, RemoteSubscription};
    use crate::resolution::payload::StagedPayload;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use url::Url;

    struct MockClient {
        login_ok: bool,
        publish_ok: bool,
        get_state: Option<String>,
        subscription_state: Option<String>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl MockClient {
        fn happy(get_state: &str) -> Self {
            Self {
                login_ok: true,
                publish_ok: true,
                get_state: Some(get_state.to_string()),
                subscription_state: Some("enabled".to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn called(&self, name: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| *c == name)
        }
    }

    #[async_trait]
    impl ManagementClient for MockClient {
        async fn login(
            &mut self,
            _username: &str,
            _password: &SecretString,
            _realm: &str,
        ) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push("login");
            if self.login_ok {
                Ok(())
            } else {
                Err(PublishError::AuthenticationFailure {
                    message: "bad credentials".to_string(),
                })
            }
        }

        async fn publish(
            &self,
            _organization: &str,
            _catalog: &str,
            _space: Option<&str>,
            payload: &StagedPayload,
        ) -> Result<RemoteProduct, PublishError> {
            self.calls.lock().unwrap().push("publish");
            assert!(!payload.parts().is_empty());
            if self.publish_ok {
                Ok(RemoteProduct {
                    id: Some("prod-42".to_string()),
                    state: Some("staged".to_string()),
                    ..Default::default()
                })
            } else {
                Err(PublishError::PublishFailure {
                    message: "rejected".to_string(),
                })
            }
        }

        async fn get(
            &self,
            _organization: &str,
            _catalog: &str,
            name: &str,
            version: &str,
        ) -> Result<RemoteProduct, PublishError> {
            self.calls.lock().unwrap().push("get");
            Ok(RemoteProduct {
                id: Some("prod-42".to_string()),
                name: Some(name.to_string()),
                version: Some(version.to_string()),
                state: self.get_state.clone(),
                ..Default::default()
            })
        }

        async fn subscribe(
            &self,
            _product_url: &Url,
            _organization: &str,
            _catalog: &str,
            _application: &str,
            _plan: &str,
            _consumer_organization: &str,
        ) -> Result<RemoteSubscription, PublishError> {
            self.calls.lock().unwrap().push("subscribe");
            Ok(RemoteSubscription {
                id: Some("sub-1".to_string()),
                state: self.subscription_state.clone(),
                extra: Default::default(),
            })
        }
    }

    fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
        fs::write(
            dir.path().join("orders.yaml"),
            "info:\n  x-ibm-name: orders\n  version: \"1.0\"\nx-ibm-configuration:\n  type: rest\n",
        )
        .unwrap();

        let product_path = dir.path().join("product.yaml");
        fs::write(
            &product_path,
            "info:\n  name: orders-product\n  version: \"1.0\"\n  title: Orders\napis:\n  orders:\n    $ref: orders.yaml\n",
        )
        .unwrap();
        product_path
    }

    fn settings(product_file: std::path::PathBuf) -> PublishSettings {
        PublishSettings {
            product_file,
            manager_host: "manager.example.com".to_string(),
            username: "operator".to_string(),
            password: SecretString::new("secret".into()),
            realm: "provider/default-idp".to_string(),
            organization: "acme".to_string(),
            catalog: "sandbox".to_string(),
            space: None,
            insecure: false,
            normalize_ref_names: false,
            subscription: None,
        }
    }

    #[tokio::test]
    async fn test_verified_publish_without_subscription() {
        let dir = TempDir::new().unwrap();
        let settings = settings(write_fixture(&dir));
        let mut client = MockClient::happy("published");

        let report = {
            let mut publisher = ProductPublisher::new(&settings, &mut client);
            let report = publisher.run().await.unwrap();
            assert_eq!(publisher.state(), WorkflowState::Done);
            report
        };

        assert_eq!(report.product_name, "orders-product");
        assert_eq!(report.state, "published");
        assert!(report.subscription.is_none());
        assert!(!client.called("subscribe"));
    }

    #[tokio::test]
    async fn test_staged_state_fails_verification_and_skips_subscription() {
        let dir = TempDir::new().unwrap();
        let mut s = settings(write_fixture(&dir));
        s.subscription = Some(SubscriptionSettings {
            application: "mobile-app".to_string(),
            plan: "gold".to_string(),
            consumer_organization: "consumers".to_string(),
        });
        let mut client = MockClient::happy("staged");

        {
            let mut publisher = ProductPublisher::new(&s, &mut client);
            let err = publisher.run().await.unwrap_err();
            assert_eq!(err.code(), "VERIFICATION_FAILURE");
            assert!(err.to_string().contains("staged"));
            assert_eq!(publisher.state(), WorkflowState::Failed);
        }

        assert!(!client.called("subscribe"));
    }

    #[tokio::test]
    async fn test_empty_state_fails_verification() {
        let dir = TempDir::new().unwrap();
        let settings = settings(write_fixture(&dir));
        let mut client = MockClient::happy("");

        let mut publisher = ProductPublisher::new(&settings, &mut client);
        let err = publisher.run().await.unwrap_err();
        assert_eq!(err.code(), "VERIFICATION_FAILURE");
    }

    #[tokio::test]
    async fn test_absent_state_fails_verification() {
        let dir = TempDir::new().unwrap();
        let settings = settings(write_fixture(&dir));
        let mut client = MockClient::happy("published");
        client.get_state = None;

        let mut publisher = ProductPublisher::new(&settings, &mut client);
        let err = publisher.run().await.unwrap_err();
        assert_eq!(err.code(), "VERIFICATION_FAILURE");
        assert!(err.to_string().contains("absent"));
    }

    #[tokio::test]
    async fn test_subscription_requested_and_enabled() {
        let dir = TempDir::new().unwrap();
        let mut s = settings(write_fixture(&dir));
        s.subscription = Some(SubscriptionSettings {
            application: "mobile-app".to_string(),
            plan: "gold".to_string(),
            consumer_organization: "consumers".to_string(),
        });
        let mut client = MockClient::happy("published");

        let report = {
            let mut publisher = ProductPublisher::new(&s, &mut client);
            publisher.run().await.unwrap()
        };

        let summary = report.summary();
        assert!(summary.contains("orders-product"));
        assert!(summary.contains("sandbox"));
        assert!(summary.contains("mobile-app"));
        assert!(summary.contains("gold"));
        assert!(client.called("subscribe"));
    }

    #[tokio::test]
    async fn test_login_failure_aborts_before_publish() {
        let dir = TempDir::new().unwrap();
        let settings = settings(write_fixture(&dir));
        let mut client = MockClient::happy("published");
        client.login_ok = false;

        {
            let mut publisher = ProductPublisher::new(&settings, &mut client);
            let err = publisher.run().await.unwrap_err();
            assert_eq!(err.code(), "AUTHENTICATION_FAILURE");
            assert_eq!(publisher.state(), WorkflowState::Failed);
        }

        assert!(!client.called("publish"));
    }

    #[tokio::test]
    async fn test_publish_failure() {
        let dir = TempDir::new().unwrap();
        let settings = settings(write_fixture(&dir));
        let mut client = MockClient::happy("published");
        client.publish_ok = false;

        {
            let mut publisher = ProductPublisher::new(&settings, &mut client);
            let err = publisher.run().await.unwrap_err();
            assert_eq!(err.code(), "PUBLISH_FAILURE");
        }

        assert!(!client.called("get"));
    }

    #[tokio::test]
    async fn test_unsupported_reference_fails_before_login() {
        let dir = TempDir::new().unwrap();
        let product_path = dir.path().join("product.yaml");
        fs::write(
            &product_path,
            "info:\n  name: p\n  version: \"1.0\"\napis:\n  orders:\n    name: \"orders:1.0\"\n",
        )
        .unwrap();
        let settings = settings(product_path);
        let mut client = MockClient::happy("published");

        {
            let mut publisher = ProductPublisher::new(&settings, &mut client);
            let err = publisher.run().await.unwrap_err();
            assert_eq!(err.code(), "UNSUPPORTED_REFERENCE_FORMAT");
        }

        assert!(!client.called("login"));
    }

    #[tokio::test]
    async fn test_summary_includes_space() {
        let dir = TempDir::new().unwrap();
        let mut s = settings(write_fixture(&dir));
        s.space = Some("dev".to_string());
        let mut client = MockClient::happy("published");

        let report = {
            let mut publisher = ProductPublisher::new(&s, &mut client);
            publisher.run().await.unwrap()
        };

        assert!(report.summary().contains("space 'dev'"));
    }
}
