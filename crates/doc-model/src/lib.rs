//! Annotation data model
//!
//! Highlights and notes attached to a rendered document. Positions are kept in
//! document space and treated as opaque by everything above this crate; the
//! serialized field names match the persisted JSON layout.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque annotation identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AnnotationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Rectangle in scaled document coordinates.
///
/// `x1/y1` is the top-left corner and `x2/y2` the bottom-right corner, both
/// relative to a page of `width` x `height` at the scale the selection was
/// made in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl ScaledRect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, width: f64, height: f64) -> Self {
        Self { x1, y1, x2, y2, width, height, page_number: None }
    }

    pub fn on_page(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }
}

/// Where an annotation sits in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub bounding_rect: ScaledRect,
    /// One rectangle per rendered line for text spans, a single one for areas.
    #[serde(default)]
    pub rects: Vec<ScaledRect>,
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_pdf_coordinates: bool,
}

impl Position {
    pub fn new(page_number: u32, bounding_rect: ScaledRect, rects: Vec<ScaledRect>) -> Self {
        Self { bounding_rect, rects, page_number, use_pdf_coordinates: false }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
    Empty,
}

/// What the annotation captured: extracted text or an image snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image snapshot for area highlights, usually a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), image: None }
    }

    pub fn image(image: impl Into<String>) -> Self {
        Self { text: None, image: Some(image.into()) }
    }

    pub fn kind(&self) -> ContentKind {
        match (&self.image, &self.text) {
            (Some(_), _) => ContentKind::Image,
            (None, Some(_)) => ContentKind::Text,
            (None, None) => ContentKind::Empty,
        }
    }
}

/// User-authored note attached to an annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Comment {
    pub fn new(text: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self { text: text.into(), emoji: emoji.into(), color: None }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// An annotation that has not been given an id yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub position: Position,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub position: Position,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub comment: Comment,
}

impl Annotation {
    pub fn from_draft(draft: NewAnnotation, id: AnnotationId) -> Self {
        let NewAnnotation { position, content, comment } = draft;
        Self { id, position, content, comment }
    }

    /// Whether the annotation carries a note worth showing in a popup.
    pub fn has_note(&self) -> bool {
        !self.comment.text.trim().is_empty()
    }
}

/// Partial update for [`Position`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionPatch {
    pub bounding_rect: Option<ScaledRect>,
    pub rects: Option<Vec<ScaledRect>>,
    pub page_number: Option<u32>,
    pub use_pdf_coordinates: Option<bool>,
}

impl PositionPatch {
    /// Patch used when an area highlight is dragged or resized.
    pub fn resize(bounding_rect: ScaledRect) -> Self {
        Self {
            bounding_rect: Some(bounding_rect),
            rects: Some(vec![bounding_rect]),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounding_rect.is_none()
            && self.rects.is_none()
            && self.page_number.is_none()
            && self.use_pdf_coordinates.is_none()
    }

    pub fn apply_to(self, position: &mut Position) {
        if let Some(bounding_rect) = self.bounding_rect {
            position.bounding_rect = bounding_rect;
        }
        if let Some(rects) = self.rects {
            position.rects = rects;
        }
        if let Some(page_number) = self.page_number {
            position.page_number = page_number;
        }
        if let Some(use_pdf_coordinates) = self.use_pdf_coordinates {
            position.use_pdf_coordinates = use_pdf_coordinates;
        }
    }
}

/// Partial update for [`Content`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub text: Option<String>,
    pub image: Option<String>,
}

impl ContentPatch {
    pub fn image(image: impl Into<String>) -> Self {
        Self { text: None, image: Some(image.into()) }
    }

    pub fn apply_to(self, content: &mut Content) {
        if let Some(text) = self.text {
            content.text = Some(text);
        }
        if let Some(image) = self.image {
            content.image = Some(image);
        }
    }
}

/// Partial update for [`Comment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPatch {
    pub text: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

impl CommentPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn apply_to(self, comment: &mut Comment) {
        if let Some(text) = self.text {
            comment.text = text;
        }
        if let Some(emoji) = self.emoji {
            comment.emoji = emoji;
        }
        if let Some(color) = self.color {
            comment.color = Some(color);
        }
    }
}

impl From<Comment> for CommentPatch {
    fn from(comment: Comment) -> Self {
        Self { text: Some(comment.text), emoji: Some(comment.emoji), color: comment.color }
    }
}
