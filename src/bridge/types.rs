//! Command protocol types
//!
//! Wire shapes:
//! - command envelope: `{viewId, requestId?, command, args?}`
//! - result envelope: `{requestId, result?, error?}`

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::instant::{AnnotationType, Annotation, Validate, ValidationError};
use crate::resource::ResourceWithLink;

// ============================================================================
// Identifiers
// ============================================================================

/// Handle of one mounted rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(u64);

impl ViewId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates one request with its result; unique for the bridge lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Mount options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    Document,
    Thumbnails,
    DocumentEditor,
}

/// Document to open, with its password if encrypted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Entry of the annotation toolbar grouping: a single item or a named group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuItemGroup {
    Item(String),
    Group { key: String, items: Vec<String> },
}

/// Options a surface is mounted with
///
/// `configuration` and `book` are forwarded to the surface as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "pageIndex", skip_serializing_if = "Option::is_none")]
    pub page_index: Option<u32>,
    #[serde(rename = "hideNavigationBar", skip_serializing_if = "Option::is_none")]
    pub hide_navigation_bar: Option<bool>,
    #[serde(rename = "showCloseButton", skip_serializing_if = "Option::is_none")]
    pub show_close_button: Option<bool>,
    #[serde(
        rename = "disableDefaultActionForTappedAnnotations",
        skip_serializing_if = "Option::is_none"
    )]
    pub disable_default_action_for_tapped_annotations: Option<bool>,
    #[serde(rename = "disableAutomaticSaving", skip_serializing_if = "Option::is_none")]
    pub disable_automatic_saving: Option<bool>,
    #[serde(rename = "annotationAuthorName", skip_serializing_if = "Option::is_none")]
    pub annotation_author_name: Option<String>,
    #[serde(rename = "fragmentTag", skip_serializing_if = "Option::is_none")]
    pub fragment_tag: Option<String>,
    #[serde(rename = "menuItemGrouping", skip_serializing_if = "Option::is_none")]
    pub menu_item_grouping: Option<Vec<MenuItemGroup>>,
    #[serde(rename = "leftBarButtonItems", skip_serializing_if = "Option::is_none")]
    pub left_bar_button_items: Option<Vec<String>>,
    #[serde(rename = "rightBarButtonItems", skip_serializing_if = "Option::is_none")]
    pub right_bar_button_items: Option<Vec<String>>,
    #[serde(rename = "toolbarTitle", skip_serializing_if = "Option::is_none")]
    pub toolbar_title: Option<String>,
    #[serde(
        rename = "showNavigationButtonInToolbar",
        skip_serializing_if = "Option::is_none"
    )]
    pub show_navigation_button_in_toolbar: Option<bool>,
    #[serde(rename = "availableFontNames", skip_serializing_if = "Option::is_none")]
    pub available_font_names: Option<Vec<String>>,
    #[serde(rename = "selectedFontName", skip_serializing_if = "Option::is_none")]
    pub selected_font_name: Option<String>,
    #[serde(rename = "showDownloadableFonts", skip_serializing_if = "Option::is_none")]
    pub show_downloadable_fonts: Option<bool>,
}

impl ViewProps {
    pub fn for_document(uri: &str) -> Self {
        Self {
            document: Some(DocumentSource {
                uri: uri.to_string(),
                password: None,
            }),
            ..Default::default()
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A command addressed to one surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "camelCase")]
pub enum Command {
    EnterAnnotationCreationMode,
    ExitCurrentlyActiveMode,
    SetLeftBarButtonItems {
        #[serde(skip_serializing_if = "Option::is_none")]
        items: Option<Vec<String>>,
        #[serde(rename = "viewMode", skip_serializing_if = "Option::is_none")]
        view_mode: Option<ViewMode>,
        animated: bool,
    },
    SetRightBarButtonItems {
        #[serde(skip_serializing_if = "Option::is_none")]
        items: Option<Vec<String>>,
        #[serde(rename = "viewMode", skip_serializing_if = "Option::is_none")]
        view_mode: Option<ViewMode>,
        animated: bool,
    },
    SaveCurrentDocument,
    GetAnnotations {
        #[serde(rename = "pageIndex")]
        page_index: u32,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        annotation_type: Option<AnnotationType>,
    },
    AddAnnotation {
        annotation: Annotation,
    },
    AddAnnotations {
        annotations: Vec<Annotation>,
    },
    RemoveAnnotation {
        annotation: Annotation,
    },
    GetAllAnnotations {
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        annotation_type: Option<AnnotationType>,
    },
    GetAllUnsavedAnnotations,
    AddResourceIcons {
        resources: Vec<Vec<ResourceWithLink>>,
    },
    GetPageSize {
        index: u32,
    },
    GetLeftBarButtonItemsForViewMode {
        #[serde(rename = "viewMode", skip_serializing_if = "Option::is_none")]
        view_mode: Option<ViewMode>,
    },
    GetRightBarButtonItemsForViewMode {
        #[serde(rename = "viewMode", skip_serializing_if = "Option::is_none")]
        view_mode: Option<ViewMode>,
    },
    GetPageThumbnail {
        #[serde(rename = "pageIndex")]
        page_index: u32,
    },
    GetThumbnails {
        #[serde(rename = "pageIndexes")]
        page_indexes: Vec<u32>,
    },
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::EnterAnnotationCreationMode => "enterAnnotationCreationMode",
            Command::ExitCurrentlyActiveMode => "exitCurrentlyActiveMode",
            Command::SetLeftBarButtonItems { .. } => "setLeftBarButtonItems",
            Command::SetRightBarButtonItems { .. } => "setRightBarButtonItems",
            Command::SaveCurrentDocument => "saveCurrentDocument",
            Command::GetAnnotations { .. } => "getAnnotations",
            Command::AddAnnotation { .. } => "addAnnotation",
            Command::AddAnnotations { .. } => "addAnnotations",
            Command::RemoveAnnotation { .. } => "removeAnnotation",
            Command::GetAllAnnotations { .. } => "getAllAnnotations",
            Command::GetAllUnsavedAnnotations => "getAllUnsavedAnnotations",
            Command::AddResourceIcons { .. } => "addResourceIcons",
            Command::GetPageSize { .. } => "getPageSize",
            Command::GetLeftBarButtonItemsForViewMode { .. } => "getLeftBarButtonItemsForViewMode",
            Command::GetRightBarButtonItemsForViewMode { .. } => {
                "getRightBarButtonItemsForViewMode"
            }
            Command::GetPageThumbnail { .. } => "getPageThumbnail",
            Command::GetThumbnails { .. } => "getThumbnails",
        }
    }

    /// Whether the surface answers this command with a result envelope
    pub fn is_request(&self) -> bool {
        !matches!(
            self,
            Command::EnterAnnotationCreationMode
                | Command::ExitCurrentlyActiveMode
                | Command::SetLeftBarButtonItems { .. }
                | Command::SetRightBarButtonItems { .. }
        )
    }

    /// Reject arguments the surface could not act on
    pub fn validate_args(&self) -> Result<(), CommandError> {
        let invalid = |e: ValidationError| CommandError::InvalidArgument(e.to_string());
        match self {
            Command::AddAnnotation { annotation } | Command::RemoveAnnotation { annotation } => {
                annotation.validate().map_err(invalid)
            }
            Command::AddAnnotations { annotations } => {
                if annotations.is_empty() {
                    return Err(CommandError::InvalidArgument(
                        "addAnnotations needs at least one annotation".to_string(),
                    ));
                }
                annotations.validate().map_err(invalid)
            }
            Command::GetThumbnails { page_indexes } if page_indexes.is_empty() => Err(
                CommandError::InvalidArgument("getThumbnails needs at least one page index".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// What the bridge puts on a surface's command queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(rename = "viewId")]
    pub view_id: ViewId,
    /// Absent for fire-and-forget commands
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(flatten)]
    pub command: Command,
}

/// What a surface sends back for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataReturned {
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DataReturned {
    pub fn success(request_id: RequestId, result: Value) -> Self {
        Self {
            request_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(request_id: RequestId, error: &str) -> Self {
        Self {
            request_id,
            result: None,
            error: Some(error.to_string()),
        }
    }

    /// Result payload, or the surface's error message verbatim
    ///
    /// Some commands report failure as `{"result": {"error": "..."}}`
    /// instead of a top-level `error`.
    pub fn into_outcome(self) -> Result<Value, String> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.result {
            Some(Value::Object(mut object)) => match object.remove("error") {
                Some(Value::String(error)) => Err(error),
                Some(other) => {
                    object.insert("error".to_string(), other);
                    Ok(Value::Object(object))
                }
                None => Ok(Value::Object(object)),
            },
            Some(result) => Ok(result),
            None => Ok(Value::Null),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// A rendered page image as sent by the surface
///
/// Either raw base64 or a `data:<mime>;base64,` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thumbnail(String);

impl Thumbnail {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type, when sent as a data URI
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.0.strip_prefix("data:")?.split(',').next()?;
        header.strip_suffix(";base64")
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let payload = match self.0.find("base64,") {
            Some(start) if self.0.starts_with("data:") => &self.0[start + "base64,".len()..],
            _ => self.0.as_str(),
        };
        STANDARD.decode(payload)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no mounted view with id {0}")]
    TargetNotFound(ViewId),

    #[error("view {0} is already mounted")]
    AlreadyMounted(ViewId),

    #[error("view {0} was unmounted before the request completed")]
    ViewDisposed(ViewId),

    #[error("{0}")]
    Remote(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid response to {command}: {reason}")]
    InvalidResponse {
        command: &'static str,
        reason: String,
    },

    #[error("too many requests in flight (limit {limit})")]
    TooManyInFlight { limit: usize },
}
