pub mod apic_client;

pub use apic_client::ApiConnectClient;
