//! Resource and link records attached to book pages

use std::path::Path;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ResourceError;

// ============================================================================
// Resource
// ============================================================================

/// A learning resource (video, quiz, document...) that can be pinned to a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_type_id: Option<i64>,
    pub resource_code: String,
    pub resource_type_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub user_id: i64,
    pub assets: Vec<Asset>,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invisible: Option<bool>,
    pub roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ResourceImage>,
    /// Unix epoch milliseconds
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
    /// Members not modelled here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    /// Deleted or hidden resources get no page icon
    pub fn is_visible(&self) -> bool {
        !self.deleted.unwrap_or(false) && !self.invisible.unwrap_or(false)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name == name)
    }
}

/// A downloadable blob belonging to a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub filename: String,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    /// Lowercase hex MD5 of the blob
    pub md5: String,
    /// Size in bytes
    pub size: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Asset {
    /// Check downloaded bytes against the recorded size and checksum
    pub fn verify(&self, bytes: &[u8]) -> Result<(), ResourceError> {
        let actual_size = bytes.len() as u64;
        if actual_size != self.size {
            return Err(ResourceError::SizeMismatch {
                asset_id: self.id,
                expected: self.size,
                actual: actual_size,
            });
        }

        let actual = hex::encode(Md5::digest(bytes));
        if !actual.eq_ignore_ascii_case(&self.md5) {
            return Err(ResourceError::ChecksumMismatch {
                asset_id: self.id,
                expected: self.md5.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// [`Asset::verify`] for a file already on disk
    pub async fn verify_file(&self, path: &Path) -> Result<(), ResourceError> {
        let bytes = tokio::fs::read(path).await?;
        self.verify(&bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Preview image URLs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub big: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Link
// ============================================================================

/// Placement of a resource on a target (page, paragraph...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    /// Unix epoch milliseconds
    pub updated_at: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resource together with the link that places it
///
/// Only constructible when `link.resource_id == resource.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResourceWithLink")]
pub struct ResourceWithLink {
    #[serde(flatten)]
    resource: Resource,
    link: Link,
    #[serde(rename = "iconName", skip_serializing_if = "Option::is_none")]
    icon_name: Option<String>,
}

#[derive(Deserialize)]
struct RawResourceWithLink {
    #[serde(flatten)]
    resource: Resource,
    link: Link,
    #[serde(rename = "iconName")]
    icon_name: Option<String>,
}

impl TryFrom<RawResourceWithLink> for ResourceWithLink {
    type Error = ResourceError;

    fn try_from(raw: RawResourceWithLink) -> Result<Self, Self::Error> {
        ResourceWithLink::new(raw.resource, raw.link).map(|r| r.with_icon_name(raw.icon_name))
    }
}

impl ResourceWithLink {
    pub fn new(resource: Resource, link: Link) -> Result<Self, ResourceError> {
        if link.resource_id != resource.id {
            return Err(ResourceError::LinkMismatch {
                link_id: link.id,
                link_resource_id: link.resource_id,
                resource_id: resource.id,
            });
        }
        Ok(Self {
            resource,
            link,
            icon_name: None,
        })
    }

    pub fn with_icon_name(mut self, icon_name: Option<String>) -> Self {
        self.icon_name = icon_name;
        self
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn icon_name(&self) -> Option<&str> {
        self.icon_name.as_deref()
    }

    pub fn into_parts(self) -> (Resource, Link) {
        (self.resource, self.link)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn resource(id: &str) -> Resource {
        Resource {
            id: id.to_string(),
            learning_type_id: None,
            resource_code: format!("code-{}", id),
            resource_type_id: 3,
            title: Some(format!("Resource {}", id)),
            user_id: 4,
            assets: Vec::new(),
            origin: "publisher".to_string(),
            description: None,
            content: None,
            value: None,
            deleted: None,
            invisible: None,
            roles: vec![Role {
                id: 1,
                name: "student".to_string(),
                extra: Map::new(),
            }],
            image: None,
            updated_at: 1_700_000_000_000,
            downloaded_at: None,
            book_id: Some(12),
            extra: Map::new(),
        }
    }

    pub fn link(id: &str, resource_id: &str, target_id: &str) -> Link {
        Link {
            id: id.to_string(),
            order: None,
            user_id: 4,
            book_id: Some(12),
            resource_id: resource_id.to_string(),
            target_id: Some(target_id.to_string()),
            resource_type_id: Some(3),
            target_type_id: Some(1),
            details: None,
            updated_at: 1_700_000_000_000,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{link, resource};
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn asset_for(bytes: &[u8]) -> Asset {
        Asset {
            id: 9,
            filename: "clip.mp4".to_string(),
            usage: Some("main".to_string()),
            compression: None,
            md5: hex::encode(Md5::digest(bytes)),
            size: bytes.len() as u64,
            url: "https://cdn.example/clip.mp4".to_string(),
            mimetype: Some("video/mp4".to_string()),
            encrypted: None,
            deleted: None,
            uploaded_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_asset_verify() {
        let asset = asset_for(b"frame data");
        assert!(asset.verify(b"frame data").is_ok());
        assert!(matches!(
            asset.verify(b"frame dat"),
            Err(ResourceError::SizeMismatch { .. })
        ));
        assert!(matches!(
            asset.verify(b"frame DATA"),
            Err(ResourceError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_asset_verify_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"frame data").await.unwrap();

        let asset = asset_for(b"frame data");
        assert!(asset.verify_file(&path).await.is_ok());
        assert!(matches!(
            asset.verify_file(&temp_dir.path().join("missing")).await,
            Err(ResourceError::Io(_))
        ));
    }

    #[test]
    fn test_asset_use_field_name() {
        let value = serde_json::to_value(asset_for(b"x")).unwrap();
        assert_eq!(value["use"], json!("main"));
    }

    #[test]
    fn test_resource_with_link_requires_matching_ids() {
        assert!(ResourceWithLink::new(resource("r1"), link("l1", "r1", "p3")).is_ok());
        assert!(matches!(
            ResourceWithLink::new(resource("r1"), link("l1", "r2", "p3")),
            Err(ResourceError::LinkMismatch { .. })
        ));
    }

    #[test]
    fn test_resource_with_link_wire_shape() {
        let combined = ResourceWithLink::new(resource("r1"), link("l1", "r1", "p3"))
            .unwrap()
            .with_icon_name(Some("video".to_string()));
        let value = serde_json::to_value(&combined).unwrap();
        assert_eq!(value["id"], json!("r1"));
        assert_eq!(value["link"]["resource_id"], json!("r1"));
        assert_eq!(value["iconName"], json!("video"));

        let back: ResourceWithLink = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back, combined);
        assert!(back.resource().extra.is_empty());

        let mut mismatched = value;
        mismatched["link"]["resource_id"] = json!("r9");
        assert!(serde_json::from_value::<ResourceWithLink>(mismatched).is_err());
    }

    #[test]
    fn test_unknown_resource_members_pass_through() {
        let mut value = serde_json::to_value(resource("r1")).unwrap();
        value["publisher_ref"] = json!({ "isbn": "978-88" });
        let decoded: Resource = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(decoded.extra["publisher_ref"]["isbn"], json!("978-88"));
        assert_eq!(serde_json::to_value(&decoded).unwrap(), value);
    }

    #[test]
    fn test_unknown_nested_members_pass_through() {
        let mut resource = resource("r1");
        resource.assets.push(asset_for(b"x"));
        resource.image = Some(ResourceImage::default());
        let combined = ResourceWithLink::new(resource, link("l1", "r1", "p3")).unwrap();

        let mut value = serde_json::to_value(&combined).unwrap();
        value["link"]["anchor"] = json!({ "paragraph": 4 });
        value["assets"][0]["drm"] = json!("none");
        value["roles"][0]["scope"] = json!("class");
        value["image"]["medium"] = json!("https://cdn.example/m.png");

        let decoded: ResourceWithLink = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(decoded.link().extra["anchor"], json!({ "paragraph": 4 }));
        assert_eq!(decoded.resource().assets[0].extra["drm"], json!("none"));
        assert_eq!(decoded.resource().roles[0].extra["scope"], json!("class"));
        assert!(decoded.resource().extra.is_empty());
        assert_eq!(serde_json::to_value(&decoded).unwrap(), value);
    }
}
