//! apic-publisher CLI
//!
//! Publishes an API product descriptor to an API Connect style manager.
//! Every flag doubles as an `INPUT_*` environment variable so the binary
//! drops into a GitHub Actions step unchanged.

use apic_publisher::core::{PublishError, PublishSettings, SubscriptionSettings};
use apic_publisher::orchestration::{ProductPublisher, PublishReport};
use apic_publisher::ApiConnectClient;
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Publish an API product to an API lifecycle manager
#[derive(Parser)]
#[command(name = "apic-publisher")]
#[command(version = "0.1.0")]
#[command(about = "Publish an API product to an API lifecycle manager", long_about = None)]
struct Cli {
    /// Product descriptor file
    #[arg(long, env = "INPUT_PRODUCTFILE", value_name = "FILE")]
    product_file: PathBuf,

    /// Manager hostname
    #[arg(long, env = "INPUT_MANAGERHOST")]
    manager_host: String,

    /// Operator username
    #[arg(long, env = "INPUT_MANAGERUSERNAME")]
    username: String,

    /// Operator password
    #[arg(long, env = "INPUT_MANAGERPASSWORD", hide_env_values = true)]
    password: String,

    /// Authentication realm
    #[arg(long, env = "INPUT_MANAGERREALM")]
    realm: String,

    /// Provider organization
    #[arg(long, env = "INPUT_ORGANIZATION")]
    organization: String,

    /// Target catalog
    #[arg(long, env = "INPUT_CATALOG")]
    catalog: String,

    /// Optional space within the catalog
    #[arg(long, env = "INPUT_SPACE")]
    space: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "INPUT_INSECURE")]
    insecure: bool,

    /// Truncate reference filenames at the first underscore before lookup
    #[arg(long, env = "INPUT_NORMALIZEREFS")]
    normalize_refs: bool,

    /// Subscribe an application after a verified publish
    #[arg(long, env = "INPUT_SUBSCRIBE")]
    subscribe: bool,

    /// Application to subscribe (with --subscribe)
    #[arg(long, env = "INPUT_APPLICATION")]
    application: Option<String>,

    /// Plan to subscribe to (with --subscribe)
    #[arg(long, env = "INPUT_PLAN")]
    plan: Option<String>,

    /// Consumer organization for the subscription (with --subscribe)
    #[arg(long, env = "INPUT_CONSUMERORGANIZATION")]
    consumer_organization: Option<String>,
}

impl Cli {
    fn into_settings(self) -> PublishSettings {
        let subscription = if self.subscribe {
            Some(SubscriptionSettings {
                application: self.application.unwrap_or_default(),
                plan: self.plan.unwrap_or_default(),
                consumer_organization: self.consumer_organization.unwrap_or_default(),
            })
        } else {
            None
        };

        PublishSettings {
            product_file: self.product_file,
            manager_host: self.manager_host,
            username: self.username,
            password: SecretString::new(self.password.into()),
            realm: self.realm,
            organization: self.organization,
            catalog: self.catalog,
            space: self.space,
            insecure: self.insecure,
            normalize_ref_names: self.normalize_refs,
            subscription,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            println!("::set-output name=result::{}", report.state);
            println!("{}", report.summary());
            process::exit(0);
        }
        Err(e) => {
            // The fetched state is still reported when verification is what failed
            if let PublishError::VerificationFailure { state: Some(state) } = &e {
                println!("::set-output name=result::{state}");
            }
            eprintln!("::error::{e}");
            process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<PublishReport, PublishError> {
    let settings = cli.into_settings();

    let mut client = ApiConnectClient::new(settings.manager_base_url()?, settings.insecure)?;
    let mut publisher = ProductPublisher::new(&settings, &mut client);

    publisher.run().await
}
