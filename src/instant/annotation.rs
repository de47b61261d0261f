//! Instant JSON annotation records (schema version 1)
//!
//! Every variant embeds [`AnnotationBase`] and keeps unknown members in an
//! `extra` map so that payloads written by newer engines survive a
//! decode/encode cycle untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::action::Action;
use super::kind::{AnnotationKind, AnnotationType, BASE_REQUIRED_FIELDS, TIMESTAMP_FIELDS};
use super::primitives::{
    BlendMode, BorderStyle, Color, Inset, LineCap, LineCaps, Opacity, Point, Rect, Rotation,
    Timestamp,
};
use super::validate::{
    decode_value, ensure_min_len, ensure_non_negative, ensure_not_empty, ensure_positive, ensure_unit_interval,
    FieldPath, Validate, ValidationError, ValidationResult, Violation,
};

/// The only schema version this crate reads and writes
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// Base record
// ============================================================================

/// Fields shared by every annotation variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBase {
    /// Schema version, always 1
    pub v: u8,
    /// Zero-based page the annotation lives on
    #[serde(rename = "pageIndex")]
    pub page_index: u32,
    /// Bounding box within the page
    pub bbox: Rect,
    pub opacity: Opacity,
    /// Object number in the source PDF
    #[serde(rename = "pdfObjectId", skip_serializing_if = "Option::is_none")]
    pub pdf_object_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<AnnotationFlag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(rename = "creatorName", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    /// Absent only on comment markers
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Public identifier, possibly assigned by a server after creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client-local correlation handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "blendMode", skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<BlendMode>,
    #[serde(rename = "customData", skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl AnnotationBase {
    /// A fresh base record with a new uuid and no public id
    pub fn new(page_index: u32, bbox: Rect) -> Self {
        let now = Timestamp::now();
        Self {
            v: SCHEMA_VERSION,
            page_index,
            bbox,
            opacity: 1.0,
            pdf_object_id: None,
            flags: None,
            action: None,
            creator_name: None,
            created_at: Some(now.clone()),
            updated_at: Some(now),
            id: None,
            uuid: Some(Uuid::new_v4().to_string()),
            name: None,
            blend_mode: None,
            custom_data: None,
        }
    }

    pub fn has_flag(&self, flag: AnnotationFlag) -> bool {
        self.flags.as_ref().is_some_and(|flags| flags.contains(&flag))
    }
}

impl Validate for AnnotationBase {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        if self.v != SCHEMA_VERSION {
            return Err(ValidationError::new(
                path.field("v"),
                Violation::UnsupportedVersion(self.v.to_string()),
            ));
        }
        self.bbox.validate_at(&path.field("bbox"))?;
        ensure_unit_interval(self.opacity, &path.field("opacity"))?;
        self.action.validate_at(&path.field("action"))?;
        self.created_at.validate_at(&path.field("createdAt"))?;
        self.updated_at.validate_at(&path.field("updatedAt"))?;
        if let (Some(created), Some(updated)) = (&self.created_at, &self.updated_at) {
            if let (Ok(created), Ok(updated)) = (created.parse(), updated.parse()) {
                if updated < created {
                    return Err(ValidationError::new(
                        path.field("updatedAt"),
                        Violation::TimestampOrder,
                    ));
                }
            }
        }
        if let Some(id) = &self.id {
            ensure_not_empty(id, &path.field("id"))?;
        }
        if let Some(uuid) = &self.uuid {
            ensure_not_empty(uuid, &path.field("uuid"))?;
        }
        Ok(())
    }
}

/// PDF annotation flags; `noPrint` replaces the PDF `print` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationFlag {
    NoPrint,
    NoZoom,
    NoRotate,
    NoView,
    Hidden,
    Invisible,
    ReadOnly,
    Locked,
    ToggleNoView,
    LockedContents,
}

/// Book-specific custom attributes; other members pass through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    #[serde(rename = "bookResource")]
    pub book_resource: bool,
    #[serde(rename = "resourceId")]
    pub resource_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Variant records
// ============================================================================

/// Highlight, squiggly, strikeout and underline markup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    /// Rectangles on the page where the markup is drawn
    pub rects: Vec<Rect>,
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Markup that marks content for removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    pub rects: Vec<Rect>,
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Border color before the redaction is applied
    #[serde(rename = "outlineColor", skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<Color>,
    /// Background color once applied
    #[serde(rename = "fillColor", skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(rename = "overlayText", skip_serializing_if = "Option::is_none")]
    pub overlay_text: Option<String>,
    #[serde(rename = "repeatOverlayText", skip_serializing_if = "Option::is_none")]
    pub repeat_overlay_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    pub text: String,
    #[serde(rename = "backgroundColor", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    /// Size in points; scales with zoom
    #[serde(rename = "fontSize")]
    pub font_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(rename = "fontStyle", skip_serializing_if = "Option::is_none")]
    pub font_style: Option<Vec<FontStyle>>,
    #[serde(rename = "fontColor")]
    pub font_color: Color,
    #[serde(rename = "horizontalAlign")]
    pub horizontal_align: HorizontalAlign,
    #[serde(rename = "verticalAlign")]
    pub vertical_align: VerticalAlign,
    #[serde(rename = "isFitting", skip_serializing_if = "Option::is_none")]
    pub is_fitting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callout: Option<Callout>,
    #[serde(rename = "borderStyle", skip_serializing_if = "Option::is_none")]
    pub border_style: Option<BorderStyle>,
    #[serde(rename = "borderWidth", skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    /// Always present: free text has a page-relative orientation
    pub rotation: Rotation,
    #[serde(rename = "cloudyBorderIntensity", skip_serializing_if = "Option::is_none")]
    pub cloudy_border_intensity: Option<f64>,
    #[serde(rename = "cloudyBorderInset", skip_serializing_if = "Option::is_none")]
    pub cloudy_border_inset: Option<Inset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Italic,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

/// Callout line from a free text box to a page location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub start: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knee: Option<Point>,
    pub end: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<LineCap>,
    /// Inset of the text box inside the bounding box
    #[serde(rename = "innerRectInset")]
    pub inner_rect_inset: Inset,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Validate for Callout {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        self.start.validate_at(&path.field("start"))?;
        self.knee.validate_at(&path.field("knee"))?;
        self.end.validate_at(&path.field("end"))?;
        self.inner_rect_inset.validate_at(&path.field("innerRectInset"))
    }
}

/// Freehand drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    pub lines: InkLines,
    /// Stroke width in points
    #[serde(rename = "lineWidth")]
    pub line_width: f64,
    /// Natural drawing mode (only honoured by some engines)
    #[serde(rename = "isDrawnNaturally", skip_serializing_if = "Option::is_none")]
    pub is_drawn_naturally: Option<bool>,
    #[serde(rename = "isSignature", skip_serializing_if = "Option::is_none")]
    pub is_signature: Option<bool>,
    #[serde(rename = "strokeColor")]
    pub stroke_color: Color,
    #[serde(rename = "backgroundColor", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ink segments with one pressure value per point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkLines {
    pub intensities: Vec<Vec<f64>>,
    pub points: Vec<Vec<Point>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InkLines {
    /// Segments with every point at the default intensity
    pub fn from_points(points: Vec<Vec<Point>>) -> Self {
        let intensities = points
            .iter()
            .map(|segment| vec![super::primitives::DEFAULT_INTENSITY; segment.len()])
            .collect();
        Self {
            intensities,
            points,
            extra: Map::new(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.iter().map(Vec::len).sum()
    }
}

impl Validate for InkLines {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        let points_path = path.field("points");
        let intensities_path = path.field("intensities");

        if self.intensities.len() != self.points.len() {
            return Err(ValidationError::new(
                intensities_path,
                Violation::LengthMismatch {
                    expected: self.points.len(),
                    actual: self.intensities.len(),
                },
            ));
        }
        for (i, (segment, weights)) in self.points.iter().zip(&self.intensities).enumerate() {
            if weights.len() != segment.len() {
                return Err(ValidationError::new(
                    intensities_path.index(i),
                    Violation::LengthMismatch {
                        expected: segment.len(),
                        actual: weights.len(),
                    },
                ));
            }
            segment.validate_at(&points_path.index(i))?;
            for (j, weight) in weights.iter().enumerate() {
                ensure_unit_interval(*weight, &intensities_path.index(i).index(j))?;
            }
        }
        if self.point_count() == 0 {
            return Err(ValidationError::new(
                points_path,
                Violation::TooFew { min: 1, actual: 0 },
            ));
        }
        Ok(())
    }
}

/// Link area; the navigation target lives in `base.action`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "borderStyle", skip_serializing_if = "Option::is_none")]
    pub border_style: Option<BorderStyle>,
    #[serde(rename = "borderWidth", skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(rename = "borderColor", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sticky note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    pub text: String,
    pub icon: NoteIcon,
    /// Fills the note shape and its icon
    pub color: Color,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteIcon {
    Comment,
    RightPointer,
    RightArrow,
    Check,
    Circle,
    Cross,
    Insert,
    NewParagraph,
    Note,
    Paragraph,
    Help,
    Star,
    Key,
}

/// Stroke settings shared by the shape family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStroke {
    #[serde(rename = "strokeDashArray", skip_serializing_if = "Option::is_none")]
    pub stroke_dash_array: Option<Vec<f64>>,
    #[serde(rename = "strokeWidth")]
    pub stroke_width: f64,
    #[serde(rename = "strokeColor")]
    pub stroke_color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Validate for ShapeStroke {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        ensure_positive(self.stroke_width, &path.field("strokeWidth"))?;
        self.stroke_color.validate_at(&path.field("strokeColor"))?;
        if let Some(dashes) = &self.stroke_dash_array {
            let dash_path = path.field("strokeDashArray");
            for (i, dash) in dashes.iter().enumerate() {
                ensure_positive(*dash, &dash_path.index(i))?;
            }
        }
        Ok(())
    }
}

/// Ellipse or rectangle filling its bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShapeAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(flatten)]
    pub stroke: ShapeStroke,
    #[serde(rename = "fillColor", skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(rename = "cloudyBorderIntensity", skip_serializing_if = "Option::is_none")]
    pub cloudy_border_intensity: Option<f64>,
    #[serde(rename = "cloudyBorderInset", skip_serializing_if = "Option::is_none")]
    pub cloudy_border_inset: Option<Inset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Straight line between two points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(flatten)]
    pub stroke: ShapeStroke,
    #[serde(rename = "startPoint")]
    pub start_point: Point,
    #[serde(rename = "endPoint")]
    pub end_point: Point,
    #[serde(rename = "lineCaps", skip_serializing_if = "Option::is_none")]
    pub line_caps: Option<LineCaps>,
    /// Fills the inside of the caps
    #[serde(rename = "fillColor", skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Open sequence of connected points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(flatten)]
    pub stroke: ShapeStroke,
    #[serde(rename = "fillColor", skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(rename = "lineCaps", skip_serializing_if = "Option::is_none")]
    pub line_caps: Option<LineCaps>,
    pub points: Vec<Point>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Closed polygon; the last point connects back to the first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(flatten)]
    pub stroke: ShapeStroke,
    #[serde(rename = "fillColor", skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    pub points: Vec<Point>,
    #[serde(rename = "cloudyBorderIntensity", skip_serializing_if = "Option::is_none")]
    pub cloudy_border_intensity: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Placed image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ImageContentType>,
    #[serde(rename = "imageAttachmentId", skip_serializing_if = "Option::is_none")]
    pub image_attachment_id: Option<ImageAttachmentId>,
    pub rotation: Rotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageContentType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "application/pdf")]
    Pdf,
}

/// Attachment reference that is either a SHA-256 content hash or the object
/// id of the attachment in the source PDF
///
/// The wire format carries no tag, so [`ImageAttachmentId::scheme`] tells the
/// two apart by shape: 64 hex digits is a hash, all ASCII digits is an object
/// id. Anything else is reported as [`AttachmentScheme::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageAttachmentId(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentScheme {
    ContentHash,
    PdfObjectId(u64),
    Unrecognized,
}

impl ImageAttachmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Content-addressed id for the given image bytes
    pub fn for_content(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn from_pdf_object_id(object_id: u64) -> Self {
        Self(object_id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> AttachmentScheme {
        if self.0.len() == 64 && hex::decode(&self.0).is_ok() {
            return AttachmentScheme::ContentHash;
        }
        if !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(object_id) = self.0.parse() {
                return AttachmentScheme::PdfObjectId(object_id);
            }
        }
        AttachmentScheme::Unrecognized
    }

    /// Whether this id addresses `bytes` by content hash
    pub fn matches_content(&self, bytes: &[u8]) -> bool {
        self.scheme() == AttachmentScheme::ContentHash
            && self.0.eq_ignore_ascii_case(&hex::encode(Sha256::digest(bytes)))
    }
}

/// Rubber stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    #[serde(rename = "stampType")]
    pub stamp_type: StampType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub rotation: Rotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Standard stamps plus `Custom`, which shows arbitrary title/subtitle text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StampType {
    Accepted,
    Approved,
    AsIs,
    Completed,
    Confidential,
    Departmental,
    Draft,
    Experimental,
    Expired,
    Final,
    ForComment,
    ForPublicRelease,
    InformationOnly,
    InitialHere,
    NotApproved,
    NotForPublicRelease,
    PreliminaryResults,
    Rejected,
    Revised,
    SignHere,
    Sold,
    TopSecret,
    Void,
    Witness,
    Custom,
}

/// Comment thread marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentMarkerAnnotation {
    #[serde(flatten)]
    pub base: AnnotationBase,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Tagged union
// ============================================================================

/// An Instant JSON annotation
///
/// Deserializing always runs [`decode_annotation`], so an `Annotation` value
/// obtained from serde has passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Annotation {
    #[serde(rename = "pspdfkit/markup/highlight")]
    Highlight(MarkupAnnotation),
    #[serde(rename = "pspdfkit/markup/squiggly")]
    Squiggly(MarkupAnnotation),
    #[serde(rename = "pspdfkit/markup/strikeout")]
    StrikeOut(MarkupAnnotation),
    #[serde(rename = "pspdfkit/markup/underline")]
    Underline(MarkupAnnotation),
    #[serde(rename = "pspdfkit/markup/redaction")]
    Redaction(RedactionAnnotation),
    #[serde(rename = "pspdfkit/text")]
    Text(TextAnnotation),
    #[serde(rename = "pspdfkit/ink")]
    Ink(InkAnnotation),
    #[serde(rename = "pspdfkit/link")]
    Link(LinkAnnotation),
    #[serde(rename = "pspdfkit/note")]
    Note(NoteAnnotation),
    #[serde(rename = "pspdfkit/shape/ellipse")]
    Ellipse(BoxShapeAnnotation),
    #[serde(rename = "pspdfkit/shape/rectangle")]
    Rectangle(BoxShapeAnnotation),
    #[serde(rename = "pspdfkit/shape/line")]
    Line(LineAnnotation),
    #[serde(rename = "pspdfkit/shape/polyline")]
    Polyline(PolylineAnnotation),
    #[serde(rename = "pspdfkit/shape/polygon")]
    Polygon(PolygonAnnotation),
    #[serde(rename = "pspdfkit/image")]
    Image(ImageAnnotation),
    #[serde(rename = "pspdfkit/stamp")]
    Stamp(StampAnnotation),
    #[serde(rename = "pspdfkit/comment-marker")]
    CommentMarker(CommentMarkerAnnotation),
}

impl Annotation {
    /// Create a highlight covering `rects`
    pub fn new_highlight(page_index: u32, rects: Vec<Rect>, color: Color) -> Self {
        let bbox = Rect::enclosing(&rects).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        Annotation::Highlight(MarkupAnnotation {
            base: AnnotationBase::new(page_index, bbox),
            rects,
            color,
            note: None,
            extra: Map::new(),
        })
    }

    /// Create an ink drawing
    pub fn new_ink(
        page_index: u32,
        bbox: Rect,
        lines: InkLines,
        line_width: f64,
        stroke_color: Color,
    ) -> Self {
        Annotation::Ink(InkAnnotation {
            base: AnnotationBase::new(page_index, bbox),
            lines,
            line_width,
            is_drawn_naturally: None,
            is_signature: None,
            stroke_color,
            background_color: None,
            note: None,
            extra: Map::new(),
        })
    }

    /// Create a sticky note
    pub fn new_note(page_index: u32, bbox: Rect, text: &str, icon: NoteIcon, color: Color) -> Self {
        Annotation::Note(NoteAnnotation {
            base: AnnotationBase::new(page_index, bbox),
            text: text.to_string(),
            icon,
            color,
            extra: Map::new(),
        })
    }

    /// Create a link area that runs `action`
    pub fn new_link(page_index: u32, bbox: Rect, action: Action) -> Self {
        let mut base = AnnotationBase::new(page_index, bbox);
        base.action = Some(action);
        Annotation::Link(LinkAnnotation {
            base,
            note: None,
            border_style: None,
            border_width: None,
            border_color: None,
            extra: Map::new(),
        })
    }

    /// Set the creator name
    pub fn with_creator(mut self, creator_name: &str) -> Self {
        self.base_mut().creator_name = Some(creator_name.to_string());
        self
    }

    /// Attach book resource metadata
    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.base_mut().custom_data = Some(custom_data);
        self
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Highlight(_) => AnnotationKind::Highlight,
            Annotation::Squiggly(_) => AnnotationKind::Squiggly,
            Annotation::StrikeOut(_) => AnnotationKind::StrikeOut,
            Annotation::Underline(_) => AnnotationKind::Underline,
            Annotation::Redaction(_) => AnnotationKind::Redaction,
            Annotation::Text(_) => AnnotationKind::Text,
            Annotation::Ink(_) => AnnotationKind::Ink,
            Annotation::Link(_) => AnnotationKind::Link,
            Annotation::Note(_) => AnnotationKind::Note,
            Annotation::Ellipse(_) => AnnotationKind::Ellipse,
            Annotation::Rectangle(_) => AnnotationKind::Rectangle,
            Annotation::Line(_) => AnnotationKind::Line,
            Annotation::Polyline(_) => AnnotationKind::Polyline,
            Annotation::Polygon(_) => AnnotationKind::Polygon,
            Annotation::Image(_) => AnnotationKind::Image,
            Annotation::Stamp(_) => AnnotationKind::Stamp,
            Annotation::CommentMarker(_) => AnnotationKind::CommentMarker,
        }
    }

    /// The `type` discriminant on the wire
    pub fn discriminant(&self) -> &'static str {
        self.kind().discriminant()
    }

    /// PDF filter name matching this record, if any
    pub fn filter_type(&self) -> Option<AnnotationType> {
        self.kind().filter_type()
    }

    pub fn base(&self) -> &AnnotationBase {
        match self {
            Annotation::Highlight(a)
            | Annotation::Squiggly(a)
            | Annotation::StrikeOut(a)
            | Annotation::Underline(a) => &a.base,
            Annotation::Redaction(a) => &a.base,
            Annotation::Text(a) => &a.base,
            Annotation::Ink(a) => &a.base,
            Annotation::Link(a) => &a.base,
            Annotation::Note(a) => &a.base,
            Annotation::Ellipse(a) | Annotation::Rectangle(a) => &a.base,
            Annotation::Line(a) => &a.base,
            Annotation::Polyline(a) => &a.base,
            Annotation::Polygon(a) => &a.base,
            Annotation::Image(a) => &a.base,
            Annotation::Stamp(a) => &a.base,
            Annotation::CommentMarker(a) => &a.base,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut AnnotationBase {
        match self {
            Annotation::Highlight(a)
            | Annotation::Squiggly(a)
            | Annotation::StrikeOut(a)
            | Annotation::Underline(a) => &mut a.base,
            Annotation::Redaction(a) => &mut a.base,
            Annotation::Text(a) => &mut a.base,
            Annotation::Ink(a) => &mut a.base,
            Annotation::Link(a) => &mut a.base,
            Annotation::Note(a) => &mut a.base,
            Annotation::Ellipse(a) | Annotation::Rectangle(a) => &mut a.base,
            Annotation::Line(a) => &mut a.base,
            Annotation::Polyline(a) => &mut a.base,
            Annotation::Polygon(a) => &mut a.base,
            Annotation::Image(a) => &mut a.base,
            Annotation::Stamp(a) => &mut a.base,
            Annotation::CommentMarker(a) => &mut a.base,
        }
    }

    /// Members this crate does not model, kept for pass-through
    pub fn extra(&self) -> &Map<String, Value> {
        match self {
            Annotation::Highlight(a)
            | Annotation::Squiggly(a)
            | Annotation::StrikeOut(a)
            | Annotation::Underline(a) => &a.extra,
            Annotation::Redaction(a) => &a.extra,
            Annotation::Text(a) => &a.extra,
            Annotation::Ink(a) => &a.extra,
            Annotation::Link(a) => &a.extra,
            Annotation::Note(a) => &a.extra,
            Annotation::Ellipse(a) | Annotation::Rectangle(a) => &a.extra,
            Annotation::Line(a) => &a.extra,
            Annotation::Polyline(a) => &a.extra,
            Annotation::Polygon(a) => &a.extra,
            Annotation::Image(a) => &a.extra,
            Annotation::Stamp(a) => &a.extra,
            Annotation::CommentMarker(a) => &a.extra,
        }
    }

    pub fn page_index(&self) -> u32 {
        self.base().page_index
    }

    pub fn uuid(&self) -> Option<&str> {
        self.base().uuid.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.base().name.as_deref()
    }
}

impl Validate for Annotation {
    fn validate_at(&self, path: &FieldPath) -> ValidationResult {
        if self.kind().requires_timestamps() {
            let base = self.base();
            for (field, value) in TIMESTAMP_FIELDS.iter().zip([&base.created_at, &base.updated_at]) {
                if value.is_none() {
                    return Err(ValidationError::new(path.field(field), Violation::MissingField));
                }
            }
        }
        self.base().validate_at(path)?;
        match self {
            Annotation::Highlight(a)
            | Annotation::Squiggly(a)
            | Annotation::StrikeOut(a)
            | Annotation::Underline(a) => validate_markup(&a.rects, &a.color, path),
            Annotation::Redaction(a) => {
                validate_markup(&a.rects, &a.color, path)?;
                a.outline_color.validate_at(&path.field("outlineColor"))?;
                a.fill_color.validate_at(&path.field("fillColor"))?;
                a.rotation.validate_at(&path.field("rotation"))
            }
            Annotation::Text(a) => {
                ensure_positive(a.font_size, &path.field("fontSize"))?;
                a.font_color.validate_at(&path.field("fontColor"))?;
                a.background_color.validate_at(&path.field("backgroundColor"))?;
                a.callout.validate_at(&path.field("callout"))?;
                validate_border(a.border_style, a.border_width, path)?;
                a.rotation.validate_at(&path.field("rotation"))?;
                validate_cloudy_border(a.cloudy_border_intensity, a.cloudy_border_inset.as_ref(), path)
            }
            Annotation::Ink(a) => {
                a.lines.validate_at(&path.field("lines"))?;
                ensure_positive(a.line_width, &path.field("lineWidth"))?;
                a.stroke_color.validate_at(&path.field("strokeColor"))?;
                a.background_color.validate_at(&path.field("backgroundColor"))
            }
            Annotation::Link(a) => {
                if a.base.action.is_none() {
                    return Err(ValidationError::new(path.field("action"), Violation::MissingField));
                }
                validate_border(a.border_style, a.border_width, path)?;
                a.border_color.validate_at(&path.field("borderColor"))
            }
            Annotation::Note(a) => a.color.validate_at(&path.field("color")),
            Annotation::Ellipse(a) | Annotation::Rectangle(a) => {
                a.stroke.validate_at(path)?;
                a.fill_color.validate_at(&path.field("fillColor"))?;
                validate_cloudy_border(a.cloudy_border_intensity, a.cloudy_border_inset.as_ref(), path)
            }
            Annotation::Line(a) => {
                a.stroke.validate_at(path)?;
                a.start_point.validate_at(&path.field("startPoint"))?;
                a.end_point.validate_at(&path.field("endPoint"))?;
                a.fill_color.validate_at(&path.field("fillColor"))
            }
            Annotation::Polyline(a) => {
                a.stroke.validate_at(path)?;
                a.fill_color.validate_at(&path.field("fillColor"))?;
                validate_point_sequence(&a.points, &path.field("points"))
            }
            Annotation::Polygon(a) => {
                a.stroke.validate_at(path)?;
                a.fill_color.validate_at(&path.field("fillColor"))?;
                validate_point_sequence(&a.points, &path.field("points"))?;
                validate_cloudy_border(a.cloudy_border_intensity, None, path)
            }
            Annotation::Image(a) => {
                a.rotation.validate_at(&path.field("rotation"))?;
                match &a.image_attachment_id {
                    Some(id) => ensure_not_empty(id.as_str(), &path.field("imageAttachmentId")),
                    None => Ok(()),
                }
            }
            Annotation::Stamp(a) => {
                a.color.validate_at(&path.field("color"))?;
                a.rotation.validate_at(&path.field("rotation"))
            }
            Annotation::CommentMarker(_) => Ok(()),
        }
    }
}

fn validate_markup(rects: &[Rect], color: &Color, path: &FieldPath) -> ValidationResult {
    let rects_path = path.field("rects");
    ensure_min_len(rects.len(), 1, &rects_path)?;
    for (i, rect) in rects.iter().enumerate() {
        rect.validate_at(&rects_path.index(i))?;
    }
    color.validate_at(&path.field("color"))
}

fn validate_border(
    style: Option<BorderStyle>,
    width: Option<f64>,
    path: &FieldPath,
) -> ValidationResult {
    match (style, width) {
        (None, Some(_)) => Err(ValidationError::new(
            path.field("borderWidth"),
            Violation::RequiresField("borderStyle"),
        )),
        (Some(_), Some(width)) => ensure_non_negative(width, &path.field("borderWidth")),
        _ => Ok(()),
    }
}

fn validate_cloudy_border(
    intensity: Option<f64>,
    inset: Option<&Inset>,
    path: &FieldPath,
) -> ValidationResult {
    if let Some(intensity) = intensity {
        ensure_non_negative(intensity, &path.field("cloudyBorderIntensity"))?;
    }
    match inset {
        Some(inset) => inset.validate_at(&path.field("cloudyBorderInset")),
        None => Ok(()),
    }
}

fn validate_point_sequence(points: &[Point], path: &FieldPath) -> ValidationResult {
    ensure_min_len(points.len(), 2, path)?;
    for (i, point) in points.iter().enumerate() {
        point.validate_at(&path.index(i))?;
    }
    Ok(())
}

// ============================================================================
// Codec
// ============================================================================

/// Classify, decode and validate an untyped annotation payload
pub fn decode_annotation(value: &Value) -> Result<Annotation, ValidationError> {
    let root = FieldPath::root();
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::new(root.clone(), Violation::NotAnObject))?;

    let discriminant = match object.get("type") {
        Some(Value::String(discriminant)) => discriminant,
        Some(other) => {
            return Err(ValidationError::new(
                root.field("type"),
                Violation::Malformed(format!("expected a string, got {}", other)),
            ))
        }
        None => return Err(ValidationError::new(root.field("type"), Violation::MissingDiscriminant)),
    };
    let kind = AnnotationKind::from_discriminant(discriminant).ok_or_else(|| {
        ValidationError::new(
            root.field("type"),
            Violation::UnknownDiscriminant(discriminant.clone()),
        )
    })?;

    let timestamps: &[&str] = if kind.requires_timestamps() {
        TIMESTAMP_FIELDS
    } else {
        &[]
    };
    for field in BASE_REQUIRED_FIELDS
        .iter()
        .chain(timestamps)
        .chain(kind.required_fields())
    {
        if !object.contains_key(*field) {
            return Err(ValidationError::new(root.field(field), Violation::MissingField));
        }
    }
    match object.get("v") {
        Some(Value::Number(version)) if version.as_u64() == Some(u64::from(SCHEMA_VERSION)) => {}
        Some(other) => {
            return Err(ValidationError::new(
                root.field("v"),
                Violation::UnsupportedVersion(other.to_string()),
            ))
        }
        None => return Err(ValidationError::new(root.field("v"), Violation::MissingField)),
    }

    // The tag is re-emitted by the enum; leaving it in would land it in `extra`.
    let mut body = object.clone();
    body.remove("type");
    let body = Value::Object(body);

    // Flattened records hide their members' paths inside the variant decode.
    decode_value::<AnnotationBase>(&body)?;
    if kind.has_stroke() {
        decode_value::<ShapeStroke>(&body)?;
    }

    let annotation = match kind {
        AnnotationKind::Highlight => Annotation::Highlight(decode_value(&body)?),
        AnnotationKind::Squiggly => Annotation::Squiggly(decode_value(&body)?),
        AnnotationKind::StrikeOut => Annotation::StrikeOut(decode_value(&body)?),
        AnnotationKind::Underline => Annotation::Underline(decode_value(&body)?),
        AnnotationKind::Redaction => Annotation::Redaction(decode_value(&body)?),
        AnnotationKind::Text => Annotation::Text(decode_value(&body)?),
        AnnotationKind::Ink => Annotation::Ink(decode_value(&body)?),
        AnnotationKind::Link => Annotation::Link(decode_value(&body)?),
        AnnotationKind::Note => Annotation::Note(decode_value(&body)?),
        AnnotationKind::Ellipse => Annotation::Ellipse(decode_value(&body)?),
        AnnotationKind::Rectangle => Annotation::Rectangle(decode_value(&body)?),
        AnnotationKind::Line => Annotation::Line(decode_value(&body)?),
        AnnotationKind::Polyline => Annotation::Polyline(decode_value(&body)?),
        AnnotationKind::Polygon => Annotation::Polygon(decode_value(&body)?),
        AnnotationKind::Image => Annotation::Image(decode_value(&body)?),
        AnnotationKind::Stamp => Annotation::Stamp(decode_value(&body)?),
        AnnotationKind::CommentMarker => Annotation::CommentMarker(decode_value(&body)?),
    };

    annotation.validate()?;
    Ok(annotation)
}

/// Validate and encode an annotation
pub fn encode_annotation(annotation: &Annotation) -> Result<Value, ValidationError> {
    annotation.validate()?;
    serde_json::to_value(annotation)
        .map_err(|e| ValidationError::new(FieldPath::root(), Violation::Malformed(e.to_string())))
}

impl<'de> Deserialize<'de> for Annotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_annotation(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::action::ActionKind;
    use serde_json::json;

    fn base_fields() -> Value {
        json!({
            "v": 1,
            "pageIndex": 0,
            "bbox": [0, 0, 100, 100],
            "opacity": 1,
            "createdAt": "2024-01-10T08:00:00.000Z",
            "updatedAt": "2024-01-10T09:30:00.000Z"
        })
    }

    fn with_base(kind: &str, fields: Value) -> Value {
        let mut payload = base_fields();
        let object = payload.as_object_mut().unwrap();
        object.insert("type".to_string(), json!(kind));
        for (key, value) in fields.as_object().unwrap() {
            object.insert(key.clone(), value.clone());
        }
        payload
    }

    fn ink_payload(intensities: Value) -> Value {
        with_base(
            "pspdfkit/ink",
            json!({
                "lines": { "points": [[[0, 0], [1, 1]]], "intensities": intensities },
                "lineWidth": 2,
                "strokeColor": "#FF0000"
            }),
        )
    }

    /// One valid payload per variant
    fn sample_payloads() -> Vec<Value> {
        vec![
            with_base(
                "pspdfkit/markup/highlight",
                json!({ "rects": [[10, 10, 50, 12]], "color": "#FFFF00", "blendMode": "multiply" }),
            ),
            with_base("pspdfkit/markup/squiggly", json!({ "rects": [[1, 1, 2, 2]], "color": "#00FF00" })),
            with_base("pspdfkit/markup/strikeout", json!({ "rects": [[1, 1, 2, 2]], "color": "#FF0000" })),
            with_base(
                "pspdfkit/markup/underline",
                json!({ "rects": [[1, 1, 2, 2]], "color": "#0000FF", "note": "check" }),
            ),
            with_base(
                "pspdfkit/markup/redaction",
                json!({
                    "rects": [[0, 0, 10, 10]],
                    "color": "#000000",
                    "outlineColor": "#FF0000",
                    "overlayText": "REDACTED",
                    "repeatOverlayText": true,
                    "rotation": 90
                }),
            ),
            with_base(
                "pspdfkit/text",
                json!({
                    "text": "Hello",
                    "fontSize": 14,
                    "fontColor": "#000000",
                    "fontStyle": ["bold"],
                    "horizontalAlign": "left",
                    "verticalAlign": "top",
                    "rotation": 0,
                    "callout": {
                        "start": [0, 0],
                        "knee": [5, 5],
                        "end": [10, 10],
                        "cap": "openArrow",
                        "innerRectInset": [1, 1, 1, 1]
                    },
                    "borderStyle": "dashed",
                    "borderWidth": 1
                }),
            ),
            ink_payload(json!([[0.5, 0.5]])),
            with_base(
                "pspdfkit/link",
                json!({ "action": { "type": "goTo", "pageIndex": 4 }, "borderColor": "#123456" }),
            ),
            with_base("pspdfkit/note", json!({ "text": "Remember", "icon": "rightPointer", "color": "#FFCC00" })),
            with_base(
                "pspdfkit/shape/ellipse",
                json!({ "strokeWidth": 2, "strokeColor": "#111111", "fillColor": "#EEEEEE" }),
            ),
            with_base(
                "pspdfkit/shape/rectangle",
                json!({ "strokeWidth": 1, "strokeColor": "#111111", "strokeDashArray": [3, 3], "cloudyBorderIntensity": 2 }),
            ),
            with_base(
                "pspdfkit/shape/line",
                json!({
                    "strokeWidth": 1,
                    "strokeColor": "#111111",
                    "startPoint": [0, 0],
                    "endPoint": [50, 50],
                    "lineCaps": { "end": "closedArrow" }
                }),
            ),
            with_base(
                "pspdfkit/shape/polyline",
                json!({ "strokeWidth": 1, "strokeColor": "#111111", "points": [[0, 0], [5, 5], [10, 0]] }),
            ),
            with_base(
                "pspdfkit/shape/polygon",
                json!({ "strokeWidth": 1, "strokeColor": "#111111", "points": [[0, 0], [5, 5], [10, 0]] }),
            ),
            with_base(
                "pspdfkit/image",
                json!({ "rotation": 0, "contentType": "image/png", "imageAttachmentId": "1234", "fileName": "logo.png" }),
            ),
            with_base(
                "pspdfkit/stamp",
                json!({ "stampType": "Custom", "title": "Reviewed", "subtitle": "by QA", "rotation": 0 }),
            ),
            with_base(
                "pspdfkit/comment-marker",
                json!({ "text": "Thread", "creatorName": "Ada" }),
            ),
        ]
    }

    #[test]
    fn test_every_variant_round_trips() {
        for payload in sample_payloads() {
            let decoded = decode_annotation(&payload)
                .unwrap_or_else(|e| panic!("{} failed: {}", payload["type"], e));
            let encoded = encode_annotation(&decoded).unwrap();
            let again = decode_annotation(&encoded).unwrap();
            assert_eq!(decoded, again, "round trip changed {}", payload["type"]);

            // Members absent on input stay absent on output.
            let input_keys: Vec<_> = payload.as_object().unwrap().keys().collect();
            let output_keys: Vec<_> = encoded.as_object().unwrap().keys().collect();
            assert_eq!(input_keys, output_keys, "member set changed for {}", payload["type"]);
        }
    }

    #[test]
    fn test_ink_scenario() {
        let decoded = decode_annotation(&ink_payload(json!([[0.5, 0.5]]))).unwrap();
        match &decoded {
            Annotation::Ink(ink) => {
                assert_eq!(ink.lines.points, vec![vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]]);
                assert_eq!(ink.lines.intensities, vec![vec![0.5, 0.5]]);
                assert_eq!(ink.line_width, 2.0);
                assert_eq!(ink.stroke_color.as_str(), "#FF0000");
                assert!(ink.is_drawn_naturally.is_none());
            }
            other => panic!("expected ink, got {:?}", other.kind()),
        }

        let err = decode_annotation(&ink_payload(json!([[0.5]]))).unwrap_err();
        assert_eq!(err.path.to_string(), "lines.intensities[0]");
        assert_eq!(
            err.violation,
            Violation::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_ink_outer_length_mismatch() {
        let err = decode_annotation(&ink_payload(json!([[0.5, 0.5], [0.5]]))).unwrap_err();
        assert_eq!(err.path.to_string(), "lines.intensities");
    }

    #[test]
    fn test_ink_requires_a_point() {
        let payload = with_base(
            "pspdfkit/ink",
            json!({
                "lines": { "points": [[]], "intensities": [[]] },
                "lineWidth": 2,
                "strokeColor": "#FF0000"
            }),
        );
        let err = decode_annotation(&payload).unwrap_err();
        assert_eq!(err.path.to_string(), "lines.points");
    }

    #[test]
    fn test_unknown_discriminant_rejected() {
        let payload = with_base("pspdfkit/hologram", json!({}));
        let err = decode_annotation(&payload).unwrap_err();
        assert_eq!(
            err.violation,
            Violation::UnknownDiscriminant("pspdfkit/hologram".to_string())
        );
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let mut payload = ink_payload(json!([[0.5, 0.5]]));
        payload.as_object_mut().unwrap().remove("lines");
        let err = decode_annotation(&payload).unwrap_err();
        assert_eq!(err.path.to_string(), "lines");
        assert_eq!(err.violation, Violation::MissingField);

        let mut payload = ink_payload(json!([[0.5, 0.5]]));
        payload.as_object_mut().unwrap().remove("createdAt");
        assert_eq!(decode_annotation(&payload).unwrap_err().path.to_string(), "createdAt");
    }

    #[test]
    fn test_future_version_rejected() {
        let mut payload = ink_payload(json!([[0.5, 0.5]]));
        payload["v"] = json!(2);
        let err = decode_annotation(&payload).unwrap_err();
        assert_eq!(err.violation, Violation::UnsupportedVersion("2".to_string()));
    }

    #[test]
    fn test_link_without_action_rejected() {
        let payload = with_base("pspdfkit/link", json!({}));
        let err = decode_annotation(&payload).unwrap_err();
        assert_eq!(err.path.to_string(), "action");
    }

    #[test]
    fn test_invariant_violations_carry_paths() {
        let cases = vec![
            (
                with_base("pspdfkit/markup/highlight", json!({ "rects": [], "color": "#FFFF00" })),
                "rects",
            ),
            (
                with_base("pspdfkit/markup/highlight", json!({ "rects": [[0, 0, 1, 1]], "color": "yellow" })),
                "color",
            ),
            (
                with_base(
                    "pspdfkit/shape/polygon",
                    json!({ "strokeWidth": 1, "strokeColor": "#111111", "points": [[0, 0]] }),
                ),
                "points",
            ),
            (
                with_base(
                    "pspdfkit/shape/ellipse",
                    json!({ "strokeWidth": 0, "strokeColor": "#111111" }),
                ),
                "strokeWidth",
            ),
            (
                with_base("pspdfkit/image", json!({ "rotation": 45 })),
                "rotation",
            ),
            (
                with_base(
                    "pspdfkit/text",
                    json!({
                        "text": "x",
                        "fontSize": 12,
                        "fontColor": "#000000",
                        "horizontalAlign": "left",
                        "verticalAlign": "top",
                        "rotation": 0,
                        "borderWidth": 2
                    }),
                ),
                "borderWidth",
            ),
        ];
        for (payload, expected_path) in cases {
            let err = decode_annotation(&payload).unwrap_err();
            assert_eq!(err.path.to_string(), expected_path, "{}", err);
        }
    }

    #[test]
    fn test_opacity_and_timestamp_order() {
        let mut payload = ink_payload(json!([[0.5, 0.5]]));
        payload["opacity"] = json!(1.5);
        assert_eq!(decode_annotation(&payload).unwrap_err().path.to_string(), "opacity");

        let mut payload = ink_payload(json!([[0.5, 0.5]]));
        payload["updatedAt"] = json!("2023-01-01T00:00:00Z");
        let err = decode_annotation(&payload).unwrap_err();
        assert_eq!(err.violation, Violation::TimestampOrder);
    }

    #[test]
    fn test_unknown_members_pass_through() {
        let payload = with_base(
            "pspdfkit/note",
            json!({
                "text": "n",
                "icon": "key",
                "color": "#FFCC00",
                "isCommentThreadRoot": true,
                "customData": { "bookResource": true, "resourceId": 7, "title": "Map", "layer": "instructor" }
            }),
        );
        let decoded = decode_annotation(&payload).unwrap();
        assert_eq!(decoded.extra().get("isCommentThreadRoot"), Some(&json!(true)));
        let custom = decoded.base().custom_data.as_ref().unwrap();
        assert_eq!(custom.resource_id, 7);
        assert_eq!(custom.extra.get("layer"), Some(&json!("instructor")));

        let encoded = encode_annotation(&decoded).unwrap();
        assert_eq!(encoded["isCommentThreadRoot"], json!(true));
        assert_eq!(encoded["customData"]["layer"], json!("instructor"));
        assert_eq!(encoded["type"], json!("pspdfkit/note"));
    }

    #[test]
    fn test_decode_type_errors_carry_paths() {
        let text = sample_payloads()
            .into_iter()
            .find(|p| p["type"] == "pspdfkit/text")
            .unwrap();
        let rectangle = sample_payloads()
            .into_iter()
            .find(|p| p["type"] == "pspdfkit/shape/rectangle")
            .unwrap();

        let mut cases = Vec::new();
        let mut payload = text.clone();
        payload["fontSize"] = json!("big");
        cases.push((payload, "fontSize"));
        let mut payload = text.clone();
        payload["pageIndex"] = json!(-1);
        cases.push((payload, "pageIndex"));
        let mut payload = text.clone();
        payload["horizontalAlign"] = json!("justify");
        cases.push((payload, "horizontalAlign"));
        let mut payload = text.clone();
        payload["callout"]["end"] = json!([10, "far"]);
        cases.push((payload, "callout.end[1]"));
        let mut payload = rectangle.clone();
        payload["strokeWidth"] = json!("thin");
        cases.push((payload, "strokeWidth"));
        let mut payload = ink_payload(json!([[0.5, 0.5]]));
        payload["lines"]["points"][0][1] = json!({ "x": 1 });
        cases.push((payload, "lines.points[0][1]"));

        for (payload, expected_path) in cases {
            let err = decode_annotation(&payload).unwrap_err();
            assert!(matches!(err.violation, Violation::Malformed(_)), "{}", err);
            assert_eq!(err.path.to_string(), expected_path, "{}", err);
        }
    }

    #[test]
    fn test_nested_unknown_members_pass_through() {
        let mut text = sample_payloads()
            .into_iter()
            .find(|p| p["type"] == "pspdfkit/text")
            .unwrap();
        text["callout"]["futureCallout"] = json!({ "shadow": true });
        let decoded = decode_annotation(&text).unwrap();
        let encoded = encode_annotation(&decoded).unwrap();
        assert_eq!(encoded["callout"]["futureCallout"], json!({ "shadow": true }));

        let mut ink = ink_payload(json!([[0.5, 0.5]]));
        ink["lines"]["pressureCurve"] = json!("linear");
        let encoded = encode_annotation(&decode_annotation(&ink).unwrap()).unwrap();
        assert_eq!(encoded["lines"]["pressureCurve"], json!("linear"));

        let mut line = sample_payloads()
            .into_iter()
            .find(|p| p["type"] == "pspdfkit/shape/line")
            .unwrap();
        line["lineCaps"]["startOffset"] = json!(2);
        line["action"] = json!({ "type": "goTo", "pageIndex": 1, "futureFlag": "keep" });
        let encoded = encode_annotation(&decode_annotation(&line).unwrap()).unwrap();
        assert_eq!(encoded["lineCaps"], json!({ "end": "closedArrow", "startOffset": 2 }));
        assert_eq!(
            encoded["action"],
            json!({ "type": "goTo", "pageIndex": 1, "futureFlag": "keep" })
        );
    }

    #[test]
    fn test_comment_marker_timestamps_are_optional() {
        let mut marker = sample_payloads()
            .into_iter()
            .find(|p| p["type"] == "pspdfkit/comment-marker")
            .unwrap();
        let object = marker.as_object_mut().unwrap();
        object.remove("createdAt");
        object.remove("updatedAt");
        let decoded = decode_annotation(&marker).unwrap();
        assert!(decoded.base().created_at.is_none());
        let encoded = encode_annotation(&decoded).unwrap();
        assert!(encoded.get("createdAt").is_none());
        assert!(encoded.get("updatedAt").is_none());

        // Order is still checked when a marker carries both.
        let mut marker = sample_payloads()
            .into_iter()
            .find(|p| p["type"] == "pspdfkit/comment-marker")
            .unwrap();
        marker["updatedAt"] = json!("2023-01-01T00:00:00Z");
        assert_eq!(
            decode_annotation(&marker).unwrap_err().violation,
            Violation::TimestampOrder
        );

        let mut ink = ink_payload(json!([[0.5, 0.5]]));
        ink.as_object_mut().unwrap().remove("updatedAt");
        let err = decode_annotation(&ink).unwrap_err();
        assert_eq!(err.path.to_string(), "updatedAt");
        assert_eq!(err.violation, Violation::MissingField);
    }

    #[test]
    fn test_serde_deserialize_goes_through_validation() {
        let result: Result<Annotation, _> = serde_json::from_value(ink_payload(json!([[0.5]])));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("lines.intensities[0]"), "{}", err);
    }

    #[test]
    fn test_image_attachment_schemes() {
        let hash = ImageAttachmentId::for_content(b"png bytes");
        assert_eq!(hash.scheme(), AttachmentScheme::ContentHash);
        assert!(hash.matches_content(b"png bytes"));
        assert!(!hash.matches_content(b"other"));

        assert_eq!(
            ImageAttachmentId::from_pdf_object_id(812).scheme(),
            AttachmentScheme::PdfObjectId(812)
        );
        assert_eq!(ImageAttachmentId::new("logo.png").scheme(), AttachmentScheme::Unrecognized);
    }

    #[test]
    fn test_constructors_produce_valid_records() {
        let highlight = Annotation::new_highlight(
            2,
            vec![Rect::new(10.0, 10.0, 40.0, 10.0), Rect::new(10.0, 22.0, 30.0, 10.0)],
            Color::from_rgb(255, 255, 0),
        )
        .with_creator("Reader");
        assert!(highlight.validate().is_ok());
        assert_eq!(highlight.base().bbox, Rect::new(10.0, 10.0, 40.0, 22.0));
        assert!(highlight.uuid().is_some());
        assert!(highlight.id().is_none());

        let link = Annotation::new_link(0, Rect::new(0.0, 0.0, 10.0, 10.0), Action::go_to(3));
        assert!(matches!(
            link.base().action.as_ref().map(|a| &a.kind),
            Some(ActionKind::GoTo { page_index: 3 })
        ));
        assert!(link.validate().is_ok());
    }
}
