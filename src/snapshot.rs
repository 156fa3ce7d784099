//! Layout snapshot – the rendered document as seen by the paginator.
//!
//! The renderer that produced the raster also exports the geometry of every
//! element it laid out. We keep a controlled subset of what a DOM offers:
//! - tag name and class list (enough for simple selectors)
//! - the element's bounding rectangle in layout pixels
//! - child elements in document order

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A bounding rectangle in layout pixels (origin = viewport top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f32,
    pub bottom: f32,
    #[serde(default)]
    pub left: f32,
    #[serde(default)]
    pub right: f32,
}

impl Rect {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    fn is_well_formed(&self) -> bool {
        [self.top, self.bottom, self.left, self.right]
            .iter()
            .all(|v| v.is_finite())
            && self.top <= self.bottom
            && self.left <= self.right
    }
}

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

/// An element node carrying tag, classes, geometry and children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutElement {
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    pub rect: Rect,
    #[serde(default)]
    pub children: Vec<LayoutElement>,
}

impl LayoutElement {
    pub fn new(tag: &str, rect: Rect) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            rect,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_children(mut self, children: Vec<LayoutElement>) -> Self {
        self.children = children;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether this element matches any of `selectors`.
    pub fn matches_any(&self, selectors: &[Selector]) -> bool {
        selectors.iter().any(|s| s.matches(self))
    }

    /// All descendants in document (pre-)order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Descendants matching any of `selectors`, in document order.
    pub fn query_all<'a>(
        &'a self,
        selectors: &'a [Selector],
    ) -> impl Iterator<Item = &'a LayoutElement> + 'a {
        self.descendants().filter(move |el| el.matches_any(selectors))
    }

    fn validate(&self, path: &mut Vec<String>) -> Result<()> {
        path.push(self.tag.clone());
        if !self.rect.is_well_formed() {
            return Err(ExportError::Snapshot(format!(
                "element {} has invalid bounds {:?}",
                path.join(" > "),
                self.rect
            )));
        }
        for child in &self.children {
            child.validate(path)?;
        }
        path.pop();
        Ok(())
    }
}

/// Pre-order iterator over an element's descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a LayoutElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a LayoutElement;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

/// A single simple selector: a tag name or a `.class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Tag(&'static str),
    Class(&'static str),
}

impl Selector {
    pub fn matches(&self, el: &LayoutElement) -> bool {
        match self {
            Selector::Tag(name) => el.tag.eq_ignore_ascii_case(name),
            Selector::Class(name) => el.has_class(name),
        }
    }
}

/// Blocks a page break must not cut through.
pub const BLOCK_SELECTORS: &[Selector] = &[
    Selector::Tag("p"),
    Selector::Tag("li"),
    Selector::Tag("blockquote"),
    Selector::Tag("pre"),
    Selector::Tag("img"),
    Selector::Tag("figure"),
    Selector::Tag("table"),
    Selector::Tag("tr"),
    Selector::Tag("dl"),
    Selector::Tag("details"),
    Selector::Class("markdown-alert"),
    Selector::Class("math-display"),
];

/// Section headings, kept with the content that follows them.
pub const HEADING_SELECTORS: &[Selector] = &[
    Selector::Tag("h1"),
    Selector::Tag("h2"),
    Selector::Tag("h3"),
    Selector::Tag("h4"),
    Selector::Tag("h5"),
    Selector::Tag("h6"),
];

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A complete layout snapshot of the content root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    /// The content root; its rect defines the origin and width of layout space.
    pub root: LayoutElement,
    /// Computed CSS background colour of the content root.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Optional captured raster as a `data:image/...;base64,` URI.
    #[serde(default)]
    pub raster: Option<String>,
}

impl LayoutSnapshot {
    pub fn new(root: LayoutElement) -> Self {
        Self {
            root,
            background_color: None,
            raster: None,
        }
    }

    /// Deserialise and validate a snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Check every rect is finite and non-inverted.
    pub fn validate(&self) -> Result<()> {
        self.root.validate(&mut Vec::new())
    }
}
