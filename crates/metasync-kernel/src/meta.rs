//! Meta documents: parsed contract files.

use crate::contract::ContractKind;
use crate::error::InvalidMetaError;
use crate::registry::ContractRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// Name of the discriminator field.
pub const TYPE_FIELD: &str = "type";

/// Outcome of loading one meta document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    Failed { error: String },
    UnknownType { type_name: String },
    MissingType,
}

/// One contract file, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaDocument {
    /// Repository-relative path with `/` separators.
    pub path: String,
    /// Raw `type` value, when one was present.
    pub type_name: Option<String>,
    /// Registered kind; `None` unless `parse_status` is `Parsed`.
    pub kind: Option<ContractKind>,
    pub raw_fields: Mapping,
    pub parse_status: ParseStatus,
}

impl MetaDocument {
    /// Parse YAML text and classify it against `registry`.
    pub fn parse(path: impl Into<String>, text: &str, registry: &ContractRegistry) -> Self {
        let path = path.into();
        let value: Value = match serde_yaml::from_str(text) {
            Ok(value) => value,
            Err(err) => return Self::failed(path, err.to_string()),
        };
        let Value::Mapping(raw_fields) = value else {
            return Self::failed(path, "top-level mapping required".to_string());
        };

        let type_name = match raw_fields.get(TYPE_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.trim().to_string()),
            Some(_) => {
                return Self::failed(path, "`type` must be a string".to_string());
            }
        };

        let (kind, parse_status) = match &type_name {
            None => (None, ParseStatus::MissingType),
            Some(name) => match registry.classify(name) {
                Some(kind) => (Some(kind), ParseStatus::Parsed),
                None => (
                    None,
                    ParseStatus::UnknownType {
                        type_name: name.clone(),
                    },
                ),
            },
        };

        Self {
            path,
            type_name,
            kind,
            raw_fields,
            parse_status,
        }
    }

    /// A document whose text could not be interpreted.
    pub fn failed(path: impl Into<String>, error: String) -> Self {
        Self {
            path: path.into(),
            type_name: None,
            kind: None,
            raw_fields: Mapping::new(),
            parse_status: ParseStatus::Failed { error },
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.parse_status == ParseStatus::Parsed
    }

    /// The `meta_type` recorded on gaps from this document.
    pub fn meta_type(&self) -> &str {
        match (&self.kind, &self.type_name) {
            (Some(kind), _) => kind.as_str(),
            (None, Some(name)) => name.as_str(),
            (None, None) => "unknown",
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw_fields.get(name)
    }

    /// Whether `name` is present with a non-null value.
    pub fn has_field(&self, name: &str) -> bool {
        !matches!(self.field(name), None | Some(Value::Null))
    }

    /// Decode the whole document into a typed view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, InvalidMetaError> {
        serde_yaml::from_value(Value::Mapping(self.raw_fields.clone())).map_err(|err| {
            InvalidMetaError::InvalidField {
                path: self.path.clone(),
                field: field_from_error(&err.to_string()),
                message: err.to_string(),
            }
        })
    }

    /// Contract fields as JSON, for generation requests.
    pub fn contract_fields(&self) -> serde_json::Value {
        serde_json::to_value(&self.raw_fields).unwrap_or(serde_json::Value::Null)
    }
}

// serde_yaml reports the offending key as a `path.to.field: message` prefix.
fn field_from_error(message: &str) -> String {
    match message.split_once(": ") {
        Some((prefix, _)) if !prefix.contains(' ') => prefix.to_string(),
        _ => "<document>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn registry() -> ContractRegistry {
        ContractRegistry::builtin()
    }

    #[test]
    fn parses_and_classifies_known_type() {
        let doc = MetaDocument::parse(
            "docs/api.meta.yaml",
            "type: doc-spec\ntarget: api.md\n",
            &registry(),
        );
        assert!(doc.is_parsed());
        assert_eq!(doc.kind, Some(ContractKind::DocSpec));
        assert_eq!(doc.meta_type(), "doc-spec");
        assert!(doc.has_field("target"));
    }

    #[test]
    fn unknown_type_keeps_name() {
        let doc = MetaDocument::parse("x.meta.yaml", "type: api-readme\n", &registry());
        assert_eq!(
            doc.parse_status,
            ParseStatus::UnknownType {
                type_name: "api-readme".to_string()
            }
        );
        assert_eq!(doc.meta_type(), "api-readme");
        assert_eq!(doc.kind, None);
    }

    #[test]
    fn missing_type_is_reported() {
        let doc = MetaDocument::parse("x.meta.yaml", "target: a.md\n", &registry());
        assert_eq!(doc.parse_status, ParseStatus::MissingType);
        assert_eq!(doc.meta_type(), "unknown");
    }

    #[test]
    fn malformed_yaml_fails_with_message() {
        let doc = MetaDocument::parse("bad.meta.yaml", "type: [unclosed\n", &registry());
        assert!(matches!(doc.parse_status, ParseStatus::Failed { .. }));
    }

    #[test]
    fn non_mapping_document_fails() {
        let doc = MetaDocument::parse("list.meta.yaml", "- a\n- b\n", &registry());
        assert_eq!(
            doc.parse_status,
            ParseStatus::Failed {
                error: "top-level mapping required".to_string()
            }
        );
    }

    #[test]
    fn decode_reports_wrong_shapes() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct View {
            target: String,
            required_sections: Vec<String>,
        }

        let doc = MetaDocument::parse(
            "d.meta.yaml",
            "type: doc-spec\ntarget: a.md\nrequired_sections: nope\n",
            &registry(),
        );
        let err = doc.decode::<View>().unwrap_err();
        assert!(matches!(err, InvalidMetaError::InvalidField { .. }));
        assert!(err.to_string().starts_with("d.meta.yaml: invalid field"));
    }

    #[test]
    fn contract_fields_render_as_json_object() {
        let doc = MetaDocument::parse(
            "d.meta.yaml",
            "type: doc-spec\ntarget: a.md\n",
            &registry(),
        );
        let fields = doc.contract_fields();
        assert_eq!(fields["target"], "a.md");
        assert_eq!(fields["type"], "doc-spec");
    }
}
