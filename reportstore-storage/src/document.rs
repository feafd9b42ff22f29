//! Report document model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field holding the report identifier
pub const ID_FIELD: &str = "id";
pub const NAME_FIELD: &str = "name";
pub const DELETED_FIELD: &str = "deleted";
pub const METADATA_FIELD: &str = "metadata";
/// Embedded base64 payload of the attachment
pub const ATTACHMENT_DATA_FIELD: &str = "attachment.data";
pub const ATTACHMENT_EXTERNAL_KEY_FIELD: &str = "attachment.external_key";
pub const ATTACHMENT_SIZE_FIELD: &str = "attachment.size_bytes";

/// A stored report as migrations see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// Binary payload attached to a report, either embedded or relocated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Base64-encoded payload while the attachment is still embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Object key once the payload lives in external storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl ReportDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata: BTreeMap::new(),
            deleted: false,
            attachment: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn mark_deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Whether the payload is still stored inside the document
    pub fn has_embedded_payload(&self) -> bool {
        self.attachment.as_ref().is_some_and(|a| a.data.is_some())
    }

    /// Whether the payload has been moved to external storage
    pub fn is_relocated(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|a| a.data.is_none() && a.external_key.is_some())
    }
}

impl Attachment {
    pub fn embedded(file_name: impl Into<String>, data_base64: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            data: Some(data_base64.into()),
            external_key: None,
            size_bytes: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Projection used when only the identifier is needed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportId {
    pub id: String,
}
