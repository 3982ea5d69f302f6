//! Reference resolution and payload assembly
//!
//! Turns a product descriptor with external `$ref` entries into a
//! self-contained, ordered multi-part publish payload.

pub mod descriptor;
pub mod payload;
pub mod resolver;

pub use descriptor::{ApiDefinition, ApiEntries, ApiEntry, ProductDescriptor, ProductInfo};
pub use payload::{PartField, PayloadBuilder, PayloadPart, StagedPayload};
pub use resolver::{RefNamePolicy, ReferenceResolver, ResolvedApi, normalize_ref_name};
