//! Payload Builder
//!
//! Assembles the resolved descriptor and every referenced artifact into the
//! ordered multi-part upload: one `openapi` part per API, its `wsdl` part
//! immediately after when present, and exactly one trailing `product` part
//! read from a freshly materialized dereferenced descriptor.

use crate::core::error::PublishError;
use crate::resolution::descriptor::ProductDescriptor;
use crate::resolution::resolver::ResolvedApi;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

pub const MEDIA_TYPE_YAML: &str = "application/yaml";
pub const MEDIA_TYPE_ZIP: &str = "application/zip";

/// Wire-level field name of a payload part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartField {
    OpenApi,
    Wsdl,
    Product,
}

impl PartField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenApi => "openapi",
            Self::Wsdl => "wsdl",
            Self::Product => "product",
        }
    }
}

/// One named part of the multi-part upload
#[derive(Debug, Clone)]
pub struct PayloadPart {
    pub field: PartField,

    /// File name declared on the wire
    pub file_name: String,

    pub media_type: &'static str,

    pub content: Vec<u8>,
}

/// The assembled upload payload
///
/// Owns the temporary file holding the dereferenced descriptor: the file
/// exists for as long as this value does and is deleted on drop, on success
/// and failure paths alike.
#[derive(Debug)]
pub struct StagedPayload {
    parts: Vec<PayloadPart>,
    descriptor_file: NamedTempFile,
}

impl StagedPayload {
    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    /// Location of the materialized dereferenced descriptor
    pub fn descriptor_path(&self) -> &Path {
        self.descriptor_file.path()
    }
}

/// Builds a `StagedPayload` from resolver output
pub struct PayloadBuilder;

impl PayloadBuilder {
    /// Stage the publish payload
    ///
    /// `product` must already be fully resolved; the builder serializes it
    /// as-is. Part order follows the resolver's declaration-order output.
    pub fn stage(
        product: &ProductDescriptor,
        resolved: &[ResolvedApi],
    ) -> Result<StagedPayload, PublishError> {
        let mut parts = Vec::with_capacity(resolved.len() * 2 + 1);

        for api in resolved {
            parts.push(PayloadPart {
                field: PartField::OpenApi,
                file_name: file_name_of(&api.api_path),
                media_type: MEDIA_TYPE_YAML,
                content: read_artifact(&api.api_path)?,
            });
            info!(path = %api.api_path.display(), "added API to the publish order");

            if let Some(wsdl_path) = &api.wsdl_path {
                parts.push(PayloadPart {
                    field: PartField::Wsdl,
                    file_name: file_name_of(wsdl_path),
                    media_type: MEDIA_TYPE_ZIP,
                    content: read_artifact(wsdl_path)?,
                });
                info!(path = %wsdl_path.display(), "added WSDL to the publish order");
            }
        }

        let descriptor_file = Self::materialize_descriptor(product)?;
        parts.push(PayloadPart {
            field: PartField::Product,
            file_name: file_name_of(descriptor_file.path()),
            media_type: MEDIA_TYPE_YAML,
            content: read_artifact(descriptor_file.path())?,
        });
        info!(path = %descriptor_file.path().display(), "added product to the publish order");

        Ok(StagedPayload {
            parts,
            descriptor_file,
        })
    }

    fn materialize_descriptor(product: &ProductDescriptor) -> Result<NamedTempFile, PublishError> {
        let yaml = serde_yaml::to_string(product).map_err(|e| PublishError::Staging {
            message: format!("failed to serialize dereferenced descriptor: {e}"),
        })?;

        let mut file = tempfile::Builder::new()
            .prefix("to_deploy-")
            .suffix(".yaml")
            .tempfile()
            .map_err(|e| PublishError::Staging {
                message: format!("failed to create temporary descriptor: {e}"),
            })?;

        file.write_all(yaml.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| PublishError::Staging {
                message: format!("failed to write temporary descriptor: {e}"),
            })?;

        Ok(file)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string())
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, PublishError> {
    std::fs::read(path).map_err(|e| PublishError::Staging {
        message: format!("failed to read {}: {e}", path.display()),
    })
}
