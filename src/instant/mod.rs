//! Instant JSON
//!
//! The annotation interchange format exchanged with the rendering surface:
//! primitive vocabulary, actions, the annotation union with its discriminant
//! tables, validation and the identity lifecycle.

pub mod action;
pub mod annotation;
pub mod identity;
pub mod kind;
pub mod primitives;
pub mod validate;

use serde_json::Value;
use thiserror::Error;

pub use action::{Action, ActionKind};
pub use annotation::{decode_annotation, encode_annotation, Annotation, AnnotationBase};
pub use identity::{IdentityError, IdentityLedger, IdentityState};
pub use kind::{AnnotationKind, AnnotationType};
pub use primitives::{Color, Dimensions, Point, Rect, Rotation, Timestamp};
pub use validate::{FieldPath, Validate, ValidationError, Violation};

/// A rejected annotation document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("expected an array of annotations or an object with an `annotations` array")]
    NotADocument,

    #[error("{} invalid annotation(s), first: {}", .0.len(), first_violation(.0))]
    InvalidAnnotations(Vec<ValidationError>),
}

fn first_violation(errors: &[ValidationError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

impl DocumentError {
    /// Every rejected record, in document order
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            DocumentError::NotADocument => &[],
            DocumentError::InvalidAnnotations(errors) => errors,
        }
    }
}

/// Decode and validate an action chain
pub fn decode_action(value: &Value) -> Result<Action, ValidationError> {
    let action: Action = validate::decode_value(value)?;
    action.validate()?;
    Ok(action)
}

/// Decode a whole annotation document
///
/// Accepts a bare array or `{"annotations": [...]}`. Every record is checked;
/// errors are anchored at the record's position in the document.
pub fn decode_document(value: &Value) -> Result<Vec<Annotation>, DocumentError> {
    let (records, prefix) = match value {
        Value::Array(records) => (records, FieldPath::root()),
        Value::Object(object) => match object.get("annotations") {
            Some(Value::Array(records)) => (records, FieldPath::root().field("annotations")),
            _ => return Err(DocumentError::NotADocument),
        },
        _ => return Err(DocumentError::NotADocument),
    };

    let mut annotations = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for (i, record) in records.iter().enumerate() {
        match decode_annotation(record) {
            Ok(annotation) => annotations.push(annotation),
            Err(e) => errors.push(e.nested_under(&prefix.index(i))),
        }
    }

    if errors.is_empty() {
        Ok(annotations)
    } else {
        Err(DocumentError::InvalidAnnotations(errors))
    }
}

/// Encode a list of annotations as a bare JSON array
pub fn encode_document(annotations: &[Annotation]) -> Result<Value, ValidationError> {
    annotations
        .iter()
        .enumerate()
        .map(|(i, annotation)| {
            encode_annotation(annotation)
                .map_err(|e| e.nested_under(&FieldPath::root().index(i)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
