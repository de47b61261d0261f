//! Field-path-qualified validation for Instant JSON payloads
//!
//! Every schema type implements [`Validate`]. Validation never coerces a
//! value: it either accepts the payload as decoded or reports the first
//! offending field together with its path (e.g. `lines.intensities[0]`).

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Segment;
use thiserror::Error;

/// One step in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named object member
    Field(String),
    /// Array element
    Index(usize),
}

/// Location of a value inside a JSON payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The payload root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path to a named member below this path
    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self(segments)
    }

    /// Path to an array element below this path
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// Prefix this path with another one
    pub fn nested_under(&self, parent: &FieldPath) -> Self {
        let mut segments = parent.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// What was wrong with the value at a path
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("expected a JSON array")]
    NotAnArray,

    #[error("missing discriminant")]
    MissingDiscriminant,

    #[error("unknown discriminant `{0}`")]
    UnknownDiscriminant(String),

    #[error("missing required field")]
    MissingField,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("unsupported schema version {0} (expected 1)")]
    UnsupportedVersion(String),

    #[error("value {value} outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("must be greater than zero, got {0}")]
    NotPositive(f64),

    #[error("must not be negative, got {0}")]
    Negative(f64),

    #[error("must be a finite number")]
    NotFinite,

    #[error("invalid color `{0}` (expected #RRGGBB)")]
    InvalidColor(String),

    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("invalid rotation {0} (expected 0, 90, 180 or 270)")]
    InvalidRotation(u16),

    #[error("expected at least {min} entries, got {actual}")]
    TooFew { min: usize, actual: usize },

    #[error("length {actual} does not match paired length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("updatedAt precedes createdAt")]
    TimestampOrder,

    #[error("must not be empty")]
    Empty,

    #[error("only allowed together with `{0}`")]
    RequiresField(&'static str),
}

/// A rejected payload
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {violation}")]
pub struct ValidationError {
    pub path: FieldPath,
    pub violation: Violation,
}

impl ValidationError {
    pub fn new(path: FieldPath, violation: Violation) -> Self {
        Self { path, violation }
    }

    /// Re-anchor this error below `parent` (used when a record is decoded
    /// as part of a larger payload)
    pub fn nested_under(self, parent: &FieldPath) -> Self {
        Self {
            path: self.path.nested_under(parent),
            violation: self.violation,
        }
    }
}

pub type ValidationResult = Result<(), ValidationError>;

impl From<&serde_path_to_error::Path> for FieldPath {
    fn from(path: &serde_path_to_error::Path) -> Self {
        path.iter().fold(FieldPath::root(), |acc, segment| match segment {
            Segment::Map { key } => acc.field(key),
            Segment::Seq { index } => acc.index(*index),
            _ => acc,
        })
    }
}

/// Deserialize `value`, reporting a type mismatch at the member that holds it
///
/// Members of `#[serde(flatten)]` records are only located down to the
/// flattened record; decode those records on their own first when the exact
/// member matters.
pub(crate) fn decode_value<T: DeserializeOwned>(value: &Value) -> Result<T, ValidationError> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = FieldPath::from(e.path());
        ValidationError::new(path, Violation::Malformed(e.into_inner().to_string()))
    })
}

/// Schema invariants beyond what the type system already guarantees
pub trait Validate {
    /// Validate with errors reported relative to `path`
    fn validate_at(&self, path: &FieldPath) -> ValidationResult;

    /// Validate with errors reported relative to the payload root
    fn validate(&self) -> ValidationResult {
        self.validate_at(&FieldPath::root())
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        match self {
            Some(value) => value.validate_at(path),
            None => Ok(()),
        }
    }
}

impl<T: Validate> Validate for Box<T> {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        (**self).validate_at(path)
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        self.iter()
            .enumerate()
            .try_for_each(|(i, item)| item.validate_at(&path.index(i)))
    }
}

pub(crate) fn ensure_finite(value: f64, path: &FieldPath) -> ValidationResult {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new(path.clone(), Violation::NotFinite))
    }
}

/// Opacity and intensity values live in `[0.0, 1.0]`
pub(crate) fn ensure_unit_interval(value: f64, path: &FieldPath) -> ValidationResult {
    ensure_finite(value, path)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            path.clone(),
            Violation::OutOfRange {
                value,
                min: 0.0,
                max: 1.0,
            },
        ))
    }
}

pub(crate) fn ensure_positive(value: f64, path: &FieldPath) -> ValidationResult {
    ensure_finite(value, path)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(path.clone(), Violation::NotPositive(value)))
    }
}

pub(crate) fn ensure_non_negative(value: f64, path: &FieldPath) -> ValidationResult {
    ensure_finite(value, path)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(path.clone(), Violation::Negative(value)))
    }
}

pub(crate) fn ensure_min_len(actual: usize, min: usize, path: &FieldPath) -> ValidationResult {
    if actual >= min {
        Ok(())
    } else {
        Err(ValidationError::new(path.clone(), Violation::TooFew { min, actual }))
    }
}

pub(crate) fn ensure_not_empty(value: &str, path: &FieldPath) -> ValidationResult {
    if value.is_empty() {
        Err(ValidationError::new(path.clone(), Violation::Empty))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = FieldPath::root()
            .field("lines")
            .field("intensities")
            .index(0)
            .index(3);
        assert_eq!(path.to_string(), "lines.intensities[0][3]");
        assert_eq!(FieldPath::root().to_string(), "$");
        assert_eq!(FieldPath::root().index(2).field("bbox").to_string(), "[2].bbox");
    }

    #[test]
    fn test_nested_error_path() {
        let err = ValidationError::new(FieldPath::root().field("color"), Violation::Empty);
        let nested = err.nested_under(&FieldPath::root().field("annotations").index(1));
        assert_eq!(nested.path.to_string(), "annotations[1].color");
        assert_eq!(nested.to_string(), "annotations[1].color: must not be empty");
    }

    #[test]
    fn test_unit_interval() {
        let path = FieldPath::root().field("opacity");
        assert!(ensure_unit_interval(0.0, &path).is_ok());
        assert!(ensure_unit_interval(1.0, &path).is_ok());
        assert!(ensure_unit_interval(1.01, &path).is_err());
        assert!(ensure_unit_interval(f64::NAN, &path).is_err());
    }

    #[test]
    fn test_decode_value_locates_type_errors() {
        #[derive(Debug, serde::Deserialize)]
        struct Stroke {
            #[allow(dead_code)]
            points: Vec<[f64; 2]>,
        }

        let value = serde_json::json!({ "points": [[0, 0], [1, "high"]] });
        let err = decode_value::<Stroke>(&value).unwrap_err();
        assert_eq!(err.path.to_string(), "points[1][1]");
        assert!(matches!(err.violation, Violation::Malformed(_)));
    }
}
