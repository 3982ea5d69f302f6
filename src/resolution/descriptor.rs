//! Product descriptor and API definition data model
//!
//! Descriptors are YAML documents with a known skeleton (`info`, `apis`) and
//! arbitrary additional fields that must survive a round trip untouched. The
//! reference form of each API entry is decided once, at load time, as a
//! closed variant; any other shape fails parsing explicitly.

use crate::core::error::PublishError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// `info` block of a product descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInfo {
    pub name: String,

    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Fields the workflow does not read, preserved verbatim
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// One entry of a product's `apis` mapping
///
/// `ByReference` (`$ref:`) is the supported input form. `ByNameVersion`
/// (`name:`) is rejected by the resolver: looking an API up across the
/// filesystem by name and version is deliberately not implemented.
/// `Resolved` is produced only by the resolver itself; it serializes as
/// `name:` but, unlike `ByNameVersion`, is skipped on a second resolve pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiEntry {
    ByNameVersion {
        name: String,
    },
    ByReference {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Resolved {
        name: String,
    },
}

/// The `apis` mapping of a product descriptor, in declared order
///
/// Serialized as a YAML mapping; kept as a list of pairs internally because
/// the payload ordering invariant follows declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiEntries(pub Vec<(String, ApiEntry)>);

impl ApiEntries {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ApiEntry)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (String, ApiEntry)> {
        self.0.iter_mut()
    }

    pub fn get(&self, key: &str) -> Option<&ApiEntry> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl Serialize for ApiEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, entry) in &self.0 {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ApiEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ApiEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of logical API name to `$ref` or `name` entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, entry)) = access.next_entry::<String, ApiEntry>()? {
                    entries.push((key, entry));
                }
                Ok(ApiEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// A declarative API-product descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDescriptor {
    pub info: ProductInfo,

    pub apis: ApiEntries,

    /// Fields the workflow does not read (plans, visibility, ...), preserved
    /// verbatim through resolution and re-serialization
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

impl ProductDescriptor {
    /// Load a product descriptor from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, PublishError> {
        let content = std::fs::read_to_string(path).map_err(|e| PublishError::DescriptorInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| PublishError::DescriptorInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// True once no external file references remain
    pub fn is_dereferenced(&self) -> bool {
        self.apis
            .iter()
            .all(|(_, entry)| !matches!(entry, ApiEntry::ByReference { .. }))
    }
}

/// `info` block of a referenced API definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiInfo {
    #[serde(rename = "x-ibm-name")]
    pub x_ibm_name: String,

    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// `x-ibm-configuration.wsdl-definition` block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsdlDefinition {
    /// Path to the WSDL artifact, relative to the product directory
    pub wsdl: String,
}

/// `x-ibm-configuration` block of an API definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfiguration {
    #[serde(rename = "type")]
    pub api_type: String,

    #[serde(rename = "wsdl-definition", skip_serializing_if = "Option::is_none")]
    pub wsdl_definition: Option<WsdlDefinition>,
}

/// The loaded content of a referenced API file, reduced to the fields the
/// workflow reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiDefinition {
    pub info: ApiInfo,

    #[serde(rename = "x-ibm-configuration")]
    pub configuration: ApiConfiguration,
}

impl ApiDefinition {
    /// The canonical `name:version` identifier of this API
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.info.x_ibm_name, self.info.version)
    }

    /// Path to the companion WSDL artifact, when this is a WSDL-typed API
    pub fn wsdl_reference(&self) -> Option<&str> {
        if self.configuration.api_type == "wsdl" {
            self.configuration
                .wsdl_definition
                .as_ref()
                .map(|w| w.wsdl.as_str())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_YAML: &str = r#"
info:
  name: orders-product
  version: "1.0"
  title: Orders
apis:
  orders:
    $ref: orders_v1.yaml
  billing:
    $ref: billing.yaml
plans:
  default:
    approval: false
"#;

    #[test]
    fn test_parse_product_descriptor() {
        let product: ProductDescriptor = serde_yaml::from_str(PRODUCT_YAML).unwrap();

        assert_eq!(product.info.name, "orders-product");
        assert_eq!(product.info.version, "1.0");
        assert_eq!(product.info.title.as_deref(), Some("Orders"));
        assert_eq!(product.apis.len(), 2);
        assert!(!product.is_dereferenced());
    }

    #[test]
    fn test_apis_preserve_declared_order() {
        let product: ProductDescriptor = serde_yaml::from_str(PRODUCT_YAML).unwrap();
        let keys: Vec<&str> = product.apis.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["orders", "billing"]);
    }

    #[test]
    fn test_ref_entry_parses_as_by_reference() {
        let product: ProductDescriptor = serde_yaml::from_str(PRODUCT_YAML).unwrap();
        assert_eq!(
            product.apis.get("orders"),
            Some(&ApiEntry::ByReference {
                ref_path: "orders_v1.yaml".to_string()
            })
        );
    }

    #[test]
    fn test_name_entry_parses_as_by_name_version() {
        let yaml = r#"
info:
  name: p
  version: "1.0"
apis:
  orders:
    name: "orders:1.0"
"#;
        let product: ProductDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            product.apis.get("orders"),
            Some(&ApiEntry::ByNameVersion {
                name: "orders:1.0".to_string()
            })
        );
    }

    #[test]
    fn test_third_shape_fails_parsing() {
        let yaml = r#"
info:
  name: p
  version: "1.0"
apis:
  orders:
    url: https://example.com/orders.yaml
"#;
        let result: Result<ProductDescriptor, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let product: ProductDescriptor = serde_yaml::from_str(PRODUCT_YAML).unwrap();
        let dumped = serde_yaml::to_string(&product).unwrap();

        let reparsed: ProductDescriptor = serde_yaml::from_str(&dumped).unwrap();
        assert!(reparsed.extra.get("plans").is_some());
        assert_eq!(reparsed.info, product.info);
    }

    #[test]
    fn test_resolved_entry_serializes_as_name() {
        let entry = ApiEntry::Resolved {
            name: "orders:1.0".to_string(),
        };
        let yaml = serde_yaml::to_string(&entry).unwrap();
        assert!(yaml.contains("name: orders:1.0"));
        assert!(!yaml.contains("$ref"));
    }

    #[test]
    fn test_api_definition_identifier() {
        let yaml = r#"
info:
  x-ibm-name: orders
  version: "1.1"
x-ibm-configuration:
  type: rest
"#;
        let api: ApiDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(api.identifier(), "orders:1.1");
        assert_eq!(api.wsdl_reference(), None);
    }

    #[test]
    fn test_api_definition_wsdl_reference() {
        let yaml = r#"
info:
  x-ibm-name: shipping
  version: "2.0"
x-ibm-configuration:
  type: wsdl
  wsdl-definition:
    wsdl: shipping.zip
"#;
        let api: ApiDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(api.wsdl_reference(), Some("shipping.zip"));
    }

    #[test]
    fn test_wsdl_definition_ignored_for_rest_type() {
        let yaml = r#"
info:
  x-ibm-name: legacy
  version: "1.0"
x-ibm-configuration:
  type: rest
  wsdl-definition:
    wsdl: stale.zip
"#;
        let api: ApiDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(api.wsdl_reference(), None);
    }

    #[test]
    fn test_from_file_missing_descriptor() {
        let err = ProductDescriptor::from_file(Path::new("/nonexistent/product.yaml")).unwrap_err();
        assert_eq!(err.code(), "DESCRIPTOR_INVALID");
    }
}
