//! Orchestration layer for the publish workflow
//!
//! The product publisher drives the linear login -> publish -> verify ->
//! (subscribe) sequence; the subscription manager handles the optional
//! final step.

pub mod product_publisher;
pub mod subscription;

pub use product_publisher::{ProductPublisher, PublishReport};
pub use subscription::{SubscriptionManager, SubscriptionOutcome};
