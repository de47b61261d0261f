//! Events raised by a rendering surface
//!
//! Wire shape is `{event, payload?}`. Decoding is strict: unknown event
//! names and payloads that fail validation are rejected, never delivered.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::instant::{Annotation, Dimensions};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ViewEvent {
    StateChanged(DocumentState),
    AnnotationsChanged(AnnotationsChange),
    AnnotationTapped(Annotation),
    DocumentLoadFailed { error: String },
    DocumentSaved,
    DocumentSaveFailed { error: String },
    NavigationButtonClicked,
    CloseButtonPressed,
    MenuButtonPressed(MenuButton),
    ThumbnailsChanged { indexes: Vec<u32> },
}

impl ViewEvent {
    pub const NAMES: [&'static str; 10] = [
        "stateChanged",
        "annotationsChanged",
        "annotationTapped",
        "documentLoadFailed",
        "documentSaved",
        "documentSaveFailed",
        "navigationButtonClicked",
        "closeButtonPressed",
        "menuButtonPressed",
        "thumbnailsChanged",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::StateChanged(_) => "stateChanged",
            ViewEvent::AnnotationsChanged(_) => "annotationsChanged",
            ViewEvent::AnnotationTapped(_) => "annotationTapped",
            ViewEvent::DocumentLoadFailed { .. } => "documentLoadFailed",
            ViewEvent::DocumentSaved => "documentSaved",
            ViewEvent::DocumentSaveFailed { .. } => "documentSaveFailed",
            ViewEvent::NavigationButtonClicked => "navigationButtonClicked",
            ViewEvent::CloseButtonPressed => "closeButtonPressed",
            ViewEvent::MenuButtonPressed(_) => "menuButtonPressed",
            ViewEvent::ThumbnailsChanged { .. } => "thumbnailsChanged",
        }
    }
}

/// Full snapshot of the surface state; never a delta
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentState {
    #[serde(rename = "documentLoaded")]
    pub document_loaded: bool,
    #[serde(rename = "currentPageIndex")]
    pub current_page_index: u32,
    #[serde(rename = "pageCount")]
    pub page_count: u32,
    #[serde(rename = "annotationCreationActive")]
    pub annotation_creation_active: bool,
    #[serde(rename = "affectedPageIndex")]
    pub affected_page_index: u32,
    #[serde(rename = "annotationEditingActive")]
    pub annotation_editing_active: bool,
    #[serde(rename = "textSelectionActive")]
    pub text_selection_active: bool,
    #[serde(rename = "formEditingActive")]
    pub form_editing_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Added and changed annotations arrive in full; removals only carry handles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum AnnotationsChange {
    Added { annotations: Vec<Annotation> },
    Changed { annotations: Vec<Annotation> },
    Removed { annotations: Vec<RemovedAnnotation> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemovedAnnotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "creatorName", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MenuButton {
    Sidebar,
    Avatar {
        #[serde(rename = "buttonDimensions")]
        button_dimensions: Dimensions,
        /// Older surfaces send the misspelled `navigationBarDimesions`
        #[serde(rename = "navigationBarDimensions", alias = "navigationBarDimesions")]
        navigation_bar_dimensions: Dimensions,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("invalid `{event}` payload: {reason}")]
    InvalidPayload { event: String, reason: String },
}

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    payload: Value,
}

impl TryFrom<RawEvent> for ViewEvent {
    type Error = EventError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let RawEvent { event, payload } = raw;
        let event = match event.as_str() {
            "stateChanged" => ViewEvent::StateChanged(payload_of(&event, payload)?),
            "annotationsChanged" => ViewEvent::AnnotationsChanged(payload_of(&event, payload)?),
            "annotationTapped" => ViewEvent::AnnotationTapped(payload_of(&event, payload)?),
            "documentLoadFailed" => {
                let ErrorPayload { error } = payload_of(&event, payload)?;
                ViewEvent::DocumentLoadFailed { error }
            }
            "documentSaveFailed" => {
                let ErrorPayload { error } = payload_of(&event, payload)?;
                ViewEvent::DocumentSaveFailed { error }
            }
            "documentSaved" => {
                expect_empty(&event, &payload)?;
                ViewEvent::DocumentSaved
            }
            "navigationButtonClicked" => {
                expect_empty(&event, &payload)?;
                ViewEvent::NavigationButtonClicked
            }
            "closeButtonPressed" => {
                expect_empty(&event, &payload)?;
                ViewEvent::CloseButtonPressed
            }
            "menuButtonPressed" => ViewEvent::MenuButtonPressed(payload_of(&event, payload)?),
            "thumbnailsChanged" => {
                let IndexesPayload { indexes } = payload_of(&event, payload)?;
                ViewEvent::ThumbnailsChanged { indexes }
            }
            _ => return Err(EventError::UnknownEvent(event.clone())),
        };
        Ok(event)
    }
}

impl<'de> Deserialize<'de> for ViewEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEvent::deserialize(deserializer)?;
        ViewEvent::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

#[derive(Deserialize)]
struct IndexesPayload {
    indexes: Vec<u32>,
}

fn payload_of<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, EventError> {
    serde_json::from_value(payload).map_err(|e| EventError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

// Payload-less events may still carry an object (e.g. touch details).
fn expect_empty(event: &str, payload: &Value) -> Result<(), EventError> {
    match payload {
        Value::Null | Value::Object(_) => Ok(()),
        other => Err(EventError::InvalidPayload {
            event: event.to_string(),
            reason: format!("expected no payload, got {}", other),
        }),
    }
}
