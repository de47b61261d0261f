//! Annotation discriminants and the PDF annotation-type filter vocabulary
//!
//! Two vocabularies name annotation types:
//!
//! - [`AnnotationKind`]: the Instant JSON `type` discriminant of a decodable
//!   record (`pspdfkit/ink`, `pspdfkit/markup/highlight`, ...)
//! - [`AnnotationType`]: PDF object type names used to filter queries
//!   (`Ink`, `Highlight`, `Widget`, ...)
//!
//! [`FILTER_DISCRIMINANTS`] maps every filter name to exactly one discriminant.
//! Some PDF types (widgets, sounds, ...) have a discriminant but no decodable
//! Instant JSON variant here.

use serde::{Deserialize, Serialize};

/// Field names every annotation record must carry
pub const BASE_REQUIRED_FIELDS: &[&str] = &["v", "pageIndex", "bbox", "opacity"];

/// Creation and modification times; optional only on comment markers
pub const TIMESTAMP_FIELDS: &[&str] = &["createdAt", "updatedAt"];

/// Discriminant of a decodable annotation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Highlight,
    Squiggly,
    StrikeOut,
    Underline,
    Redaction,
    Text,
    Ink,
    Link,
    Note,
    Ellipse,
    Rectangle,
    Line,
    Polyline,
    Polygon,
    Image,
    Stamp,
    CommentMarker,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 17] = [
        AnnotationKind::Highlight,
        AnnotationKind::Squiggly,
        AnnotationKind::StrikeOut,
        AnnotationKind::Underline,
        AnnotationKind::Redaction,
        AnnotationKind::Text,
        AnnotationKind::Ink,
        AnnotationKind::Link,
        AnnotationKind::Note,
        AnnotationKind::Ellipse,
        AnnotationKind::Rectangle,
        AnnotationKind::Line,
        AnnotationKind::Polyline,
        AnnotationKind::Polygon,
        AnnotationKind::Image,
        AnnotationKind::Stamp,
        AnnotationKind::CommentMarker,
    ];

    /// The `type` value on the wire
    pub fn discriminant(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "pspdfkit/markup/highlight",
            AnnotationKind::Squiggly => "pspdfkit/markup/squiggly",
            AnnotationKind::StrikeOut => "pspdfkit/markup/strikeout",
            AnnotationKind::Underline => "pspdfkit/markup/underline",
            AnnotationKind::Redaction => "pspdfkit/markup/redaction",
            AnnotationKind::Text => "pspdfkit/text",
            AnnotationKind::Ink => "pspdfkit/ink",
            AnnotationKind::Link => "pspdfkit/link",
            AnnotationKind::Note => "pspdfkit/note",
            AnnotationKind::Ellipse => "pspdfkit/shape/ellipse",
            AnnotationKind::Rectangle => "pspdfkit/shape/rectangle",
            AnnotationKind::Line => "pspdfkit/shape/line",
            AnnotationKind::Polyline => "pspdfkit/shape/polyline",
            AnnotationKind::Polygon => "pspdfkit/shape/polygon",
            AnnotationKind::Image => "pspdfkit/image",
            AnnotationKind::Stamp => "pspdfkit/stamp",
            AnnotationKind::CommentMarker => "pspdfkit/comment-marker",
        }
    }

    pub fn from_discriminant(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.discriminant() == value)
    }

    /// Variant fields that must be present in addition to [`BASE_REQUIRED_FIELDS`]
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            AnnotationKind::Highlight
            | AnnotationKind::Squiggly
            | AnnotationKind::StrikeOut
            | AnnotationKind::Underline
            | AnnotationKind::Redaction => &["rects", "color"],
            AnnotationKind::Text => &[
                "text",
                "fontSize",
                "fontColor",
                "horizontalAlign",
                "verticalAlign",
                "rotation",
            ],
            AnnotationKind::Ink => &["lines", "lineWidth", "strokeColor"],
            AnnotationKind::Link => &["action"],
            AnnotationKind::Note => &["text", "icon", "color"],
            AnnotationKind::Ellipse | AnnotationKind::Rectangle => &["strokeWidth", "strokeColor"],
            AnnotationKind::Line => &["strokeWidth", "strokeColor", "startPoint", "endPoint"],
            AnnotationKind::Polyline | AnnotationKind::Polygon => {
                &["strokeWidth", "strokeColor", "points"]
            }
            AnnotationKind::Image => &["rotation"],
            AnnotationKind::Stamp => &["stampType", "rotation"],
            AnnotationKind::CommentMarker => &["text"],
        }
    }

    pub fn requires_timestamps(&self) -> bool {
        !matches!(self, AnnotationKind::CommentMarker)
    }

    /// Shape variants carrying the flattened stroke settings
    pub fn has_stroke(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Ellipse
                | AnnotationKind::Rectangle
                | AnnotationKind::Line
                | AnnotationKind::Polyline
                | AnnotationKind::Polygon
        )
    }

    /// PDF filter name for this variant, if it has one
    pub fn filter_type(&self) -> Option<AnnotationType> {
        AnnotationType::from_discriminant(self.discriminant())
    }
}

/// PDF annotation object type, used to filter annotation queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationType {
    Link,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Text,
    Caret,
    FreeText,
    Ink,
    Square,
    Circle,
    Line,
    Signature,
    Stamp,
    Eraser,
    Image,
    Widget,
    FileAttachment,
    Sound,
    Polygon,
    PolyLine,
    RichMedia,
    Screen,
    Popup,
    Watermark,
    TrapNet,
    #[serde(rename = "3D")]
    ThreeD,
    Redact,
}

/// Filter name to discriminant, one row per filter name
pub const FILTER_DISCRIMINANTS: [(AnnotationType, &str); 28] = [
    (AnnotationType::Link, "pspdfkit/link"),
    (AnnotationType::Highlight, "pspdfkit/markup/highlight"),
    (AnnotationType::Underline, "pspdfkit/markup/underline"),
    (AnnotationType::Squiggly, "pspdfkit/markup/squiggly"),
    (AnnotationType::StrikeOut, "pspdfkit/markup/strikeout"),
    (AnnotationType::Text, "pspdfkit/note"),
    (AnnotationType::Caret, "pspdfkit/caret"),
    (AnnotationType::FreeText, "pspdfkit/text"),
    (AnnotationType::Ink, "pspdfkit/ink"),
    (AnnotationType::Square, "pspdfkit/shape/rectangle"),
    (AnnotationType::Circle, "pspdfkit/shape/ellipse"),
    (AnnotationType::Line, "pspdfkit/shape/line"),
    (AnnotationType::Signature, "pspdfkit/signature"),
    (AnnotationType::Stamp, "pspdfkit/stamp"),
    (AnnotationType::Eraser, "pspdfkit/eraser"),
    (AnnotationType::Image, "pspdfkit/image"),
    (AnnotationType::Widget, "pspdfkit/widget"),
    (AnnotationType::FileAttachment, "pspdfkit/file-attachment"),
    (AnnotationType::Sound, "pspdfkit/sound"),
    (AnnotationType::Polygon, "pspdfkit/shape/polygon"),
    (AnnotationType::PolyLine, "pspdfkit/shape/polyline"),
    (AnnotationType::RichMedia, "pspdfkit/rich-media"),
    (AnnotationType::Screen, "pspdfkit/screen"),
    (AnnotationType::Popup, "pspdfkit/popup"),
    (AnnotationType::Watermark, "pspdfkit/watermark"),
    (AnnotationType::TrapNet, "pspdfkit/trap-net"),
    (AnnotationType::ThreeD, "pspdfkit/3d"),
    (AnnotationType::Redact, "pspdfkit/markup/redaction"),
];

impl AnnotationType {
    /// Internal discriminant this filter name selects
    pub fn discriminant(&self) -> &'static str {
        FILTER_DISCRIMINANTS
            .iter()
            .find(|(name, _)| name == self)
            .map(|(_, discriminant)| *discriminant)
            .unwrap_or_default()
    }

    pub fn from_discriminant(value: &str) -> Option<Self> {
        FILTER_DISCRIMINANTS
            .iter()
            .find(|(_, discriminant)| *discriminant == value)
            .map(|(name, _)| *name)
    }

    /// Decodable variant selected by this filter, if any
    pub fn kind(&self) -> Option<AnnotationKind> {
        AnnotationKind::from_discriminant(self.discriminant())
    }

    /// PDF name as sent on the wire
    pub fn pdf_name(&self) -> &'static str {
        match self {
            AnnotationType::Link => "Link",
            AnnotationType::Highlight => "Highlight",
            AnnotationType::Underline => "Underline",
            AnnotationType::Squiggly => "Squiggly",
            AnnotationType::StrikeOut => "StrikeOut",
            AnnotationType::Text => "Text",
            AnnotationType::Caret => "Caret",
            AnnotationType::FreeText => "FreeText",
            AnnotationType::Ink => "Ink",
            AnnotationType::Square => "Square",
            AnnotationType::Circle => "Circle",
            AnnotationType::Line => "Line",
            AnnotationType::Signature => "Signature",
            AnnotationType::Stamp => "Stamp",
            AnnotationType::Eraser => "Eraser",
            AnnotationType::Image => "Image",
            AnnotationType::Widget => "Widget",
            AnnotationType::FileAttachment => "FileAttachment",
            AnnotationType::Sound => "Sound",
            AnnotationType::Polygon => "Polygon",
            AnnotationType::PolyLine => "PolyLine",
            AnnotationType::RichMedia => "RichMedia",
            AnnotationType::Screen => "Screen",
            AnnotationType::Popup => "Popup",
            AnnotationType::Watermark => "Watermark",
            AnnotationType::TrapNet => "TrapNet",
            AnnotationType::ThreeD => "3D",
            AnnotationType::Redact => "Redact",
        }
    }
}
