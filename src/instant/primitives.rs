//! Geometry and scalar vocabulary shared by actions and annotations
//!
//! Colors and timestamps keep the exact string they were decoded from, so a
//! decoded record encodes back to the same text.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validate::{
    ensure_finite, ensure_non_negative, FieldPath, Validate, ValidationError, ValidationResult,
    Violation,
};

/// 0.0 to 1.0
pub type Opacity = f64;

/// 0.0 to 1.0, pressure weight of an ink point
pub type Intensity = f64;

/// Intensity to use when the input device reports no pressure
pub const DEFAULT_INTENSITY: Intensity = 0.5;

/// `[left, top, width, height]` in page points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect(pub [f64; 4]);

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self([left, top, width, height])
    }

    pub fn left(&self) -> f64 {
        self.0[0]
    }

    pub fn top(&self) -> f64 {
        self.0[1]
    }

    pub fn width(&self) -> f64 {
        self.0[2]
    }

    pub fn height(&self) -> f64 {
        self.0[3]
    }

    pub fn right(&self) -> f64 {
        self.left() + self.width()
    }

    pub fn bottom(&self) -> f64 {
        self.top() + self.height()
    }

    /// Smallest rectangle containing every rectangle in `rects`
    pub fn enclosing(rects: &[Rect]) -> Option<Rect> {
        let first = rects.first()?;
        let (mut left, mut top, mut right, mut bottom) =
            (first.left(), first.top(), first.right(), first.bottom());
        for rect in &rects[1..] {
            left = left.min(rect.left());
            top = top.min(rect.top());
            right = right.max(rect.right());
            bottom = bottom.max(rect.bottom());
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

impl Validate for Rect {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        ensure_finite(self.left(), &path.index(0))?;
        ensure_finite(self.top(), &path.index(1))?;
        ensure_non_negative(self.width(), &path.index(2))?;
        ensure_non_negative(self.height(), &path.index(3))
    }
}

/// `[x, y]` in page points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub [f64; 2]);

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self([x, y])
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }
}

impl Validate for Point {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        ensure_finite(self.x(), &path.index(0))?;
        ensure_finite(self.y(), &path.index(1))
    }
}

/// `[left, top, right, bottom]` inset, used for cloudy borders and callout boxes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inset(pub [f64; 4]);

impl Validate for Inset {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        self.0
            .iter()
            .enumerate()
            .try_for_each(|(i, value)| ensure_finite(*value, &path.index(i)))
    }
}

/// Counterclockwise rotation in degrees
///
/// Decoded as a plain integer; anything outside {0, 90, 180, 270} is
/// rejected by validation rather than by the decoder, so the error carries
/// the field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(u16);

impl Rotation {
    pub const ZERO: Rotation = Rotation(0);
    pub const QUARTER: Rotation = Rotation(90);
    pub const HALF: Rotation = Rotation(180);
    pub const THREE_QUARTERS: Rotation = Rotation(270);

    pub fn new(degrees: u16) -> Option<Self> {
        match degrees {
            0 | 90 | 180 | 270 => Some(Self(degrees)),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u16 {
        self.0
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Validate for Rotation {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        match Rotation::new(self.0) {
            Some(_) => Ok(()),
            None => Err(ValidationError::new(
                path.clone(),
                Violation::InvalidRotation(self.0),
            )),
        }
    }
}

/// `"#RRGGBB"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Parse a `#RRGGBB` string, keeping its original case
    pub fn parse(value: &str) -> Option<Self> {
        let color = Self(value.to_string());
        color.rgb().map(|_| color)
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02X}{:02X}{:02X}", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green and blue channels, if the string is well formed
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some((channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Validate for Color {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        match self.rgb() {
            Some(_) => Ok(()),
            None => Err(ValidationError::new(
                path.clone(),
                Violation::InvalidColor(self.0.clone()),
            )),
        }
    }
}

/// ISO 8601 timestamp with date, time and offset, e.g. `2012-04-23T18:25:43.511Z`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Wrap a string without checking it; validation reports bad values
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(&self.0)
    }
}

impl Validate for Timestamp {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        self.parse().map(|_| ()).map_err(|_| {
            ValidationError::new(path.clone(), Violation::InvalidTimestamp(self.0.clone()))
        })
    }
}

/// Width and height in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Validate for Dimensions {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        ensure_non_negative(self.width, &path.field("width"))?;
        ensure_non_negative(self.height, &path.field("height"))
    }
}

/// Line ending style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineCap {
    Square,
    Circle,
    Diamond,
    OpenArrow,
    ClosedArrow,
    Butt,
    ReverseOpenArrow,
    ReverseClosedArrow,
    Slash,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineCaps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<LineCap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<LineCap>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    Solid,
    Dashed,
    Beveled,
    Inset,
    Underline,
}
