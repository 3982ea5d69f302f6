pub mod client;
pub mod core;
pub mod orchestration;
pub mod resolution;

pub use crate::client::ApiConnectClient;
pub use crate::core::{
    ManagementClient, PublishError, PublishSettings, RemoteProduct, RemoteSubscription,
    SubscriptionSettings, WorkflowState, WorkflowStateMachine,
};
pub use crate::orchestration::{ProductPublisher, PublishReport, SubscriptionManager};
pub use crate::resolution::{
    PayloadBuilder, ProductDescriptor, RefNamePolicy, ReferenceResolver, StagedPayload,
};
