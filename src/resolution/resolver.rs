//! Reference Resolver
//!
//! Walks a product descriptor's `apis` entries in declared order, resolves
//! each `$ref` to a concrete API file next to the product descriptor, and
//! rewrites the entry in place to its canonical `name:version` form. The
//! descriptor comes out self-contained; the collected artifact list feeds
//! the payload builder.

use crate::core::error::PublishError;
use crate::resolution::descriptor::{ApiDefinition, ApiEntry, ProductDescriptor};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a `$ref` filename is turned into the filename to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefNamePolicy {
    /// Use the reference path exactly as written
    #[default]
    Verbatim,

    /// Truncate at the first `_` and append `.yaml`. Used when reference
    /// filenames embed suffixes that are not part of the on-disk name.
    TruncateAtUnderscore,
}

impl RefNamePolicy {
    pub fn from_flag(normalize: bool) -> Self {
        if normalize {
            Self::TruncateAtUnderscore
        } else {
            Self::Verbatim
        }
    }
}

/// Apply a reference-name normalization policy
///
/// `TruncateAtUnderscore` takes the substring before the first `_` and
/// appends `.yaml`, nothing more:
/// - `"resourceconfigurationrest_1.1.yaml"` -> `"resourceconfigurationrest.yaml"`
/// - `"orders.yaml"` -> `"orders.yaml.yaml"` (no underscore: the extension
///   is appended regardless, so the policy only fits references that embed
///   an underscore suffix)
///
/// With `Verbatim` the input is returned unchanged.
pub fn normalize_ref_name(ref_path: &str, policy: RefNamePolicy) -> String {
    match policy {
        RefNamePolicy::Verbatim => ref_path.to_string(),
        RefNamePolicy::TruncateAtUnderscore => {
            let stem = ref_path.split('_').next().unwrap_or(ref_path);
            format!("{stem}.yaml")
        }
    }
}

/// One resolved API: its parsed definition plus the artifact paths the
/// payload builder will read
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedApi {
    /// Logical name of the entry in the product's `apis` mapping
    pub logical_name: String,

    pub definition: ApiDefinition,

    /// Path of the API definition file (`openapi` part)
    pub api_path: PathBuf,

    /// Path of the companion WSDL artifact (`wsdl` part), when present
    pub wsdl_path: Option<PathBuf>,
}

/// Resolves external `$ref` entries against the product's directory
pub struct ReferenceResolver {
    product_dir: PathBuf,
    policy: RefNamePolicy,
}

impl ReferenceResolver {
    /// Create a resolver for a product descriptor living in `product_dir`
    pub fn new<P: AsRef<Path>>(product_dir: P, policy: RefNamePolicy) -> Self {
        Self {
            product_dir: product_dir.as_ref().to_path_buf(),
            policy,
        }
    }

    /// Resolve every entry of the descriptor's `apis` mapping, in declared
    /// order, rewriting each `$ref` entry to `Resolved { name }` in place.
    ///
    /// Already-resolved entries are skipped, so resolving a descriptor a
    /// second time is a no-op. `ByNameVersion` input always fails: there is
    /// no filesystem search by name and version.
    pub fn resolve(
        &self,
        product: &mut ProductDescriptor,
    ) -> Result<Vec<ResolvedApi>, PublishError> {
        let mut resolved = Vec::new();

        for (logical_name, entry) in product.apis.iter_mut() {
            match entry {
                ApiEntry::Resolved { .. } => continue,
                ApiEntry::ByNameVersion { .. } => {
                    return Err(PublishError::UnsupportedReferenceFormat {
                        api: logical_name.clone(),
                    });
                }
                ApiEntry::ByReference { ref_path } => {
                    debug!(api = %logical_name, reference = %ref_path, "resolving API $ref");

                    let clean_name = normalize_ref_name(ref_path, self.policy);
                    if clean_name != *ref_path {
                        debug!(from = %ref_path, to = %clean_name, "normalized reference name");
                    }

                    let api_path = self.product_dir.join(&clean_name);
                    let definition = self.load_api(ref_path, &api_path)?;

                    let identifier = definition.identifier();
                    debug!(from = %ref_path, to = %identifier, "translated reference");

                    let wsdl_path = definition
                        .wsdl_reference()
                        .map(|wsdl| self.product_dir.join(wsdl));

                    resolved.push(ResolvedApi {
                        logical_name: logical_name.clone(),
                        definition,
                        api_path,
                        wsdl_path,
                    });

                    *entry = ApiEntry::Resolved { name: identifier };
                }
            }
        }

        Ok(resolved)
    }

    fn load_api(&self, reference: &str, path: &Path) -> Result<ApiDefinition, PublishError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PublishError::ReferenceNotFound {
                reference: reference.to_string(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        serde_yaml::from_str(&content).map_err(|e| PublishError::ReferenceNotFound {
            reference: reference.to_string(),
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
