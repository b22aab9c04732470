use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

// ============================================================================
// Page document as dumped by the page-side extraction script
// ============================================================================

/// One captured page: metadata plus the root of the element tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomPage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    pub root: DomNode,
}

impl DomPage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            url: self.url.clone(),
            title: self.title.clone(),
            viewport: self.viewport,
        }
    }
}

/// Page metadata carried into an analysis result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: Option<String>,
    pub title: Option<String>,
    pub viewport: Option<Viewport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn intersects(&self, viewport: &Viewport) -> bool {
        self.x < viewport.width
            && self.y < viewport.height
            && self.x + self.width > 0.0
            && self.y + self.height > 0.0
    }
}

/// The subset of computed style the scanner cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
}

impl ComputedStyle {
    pub fn is_hidden(&self) -> bool {
        self.display.as_deref() == Some("none")
            || matches!(self.visibility.as_deref(), Some("hidden") | Some("collapse"))
            || self.opacity.is_some_and(|o| o <= 0.0)
    }
}

/// Live form state, read from element properties rather than attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
    #[serde(default)]
    pub valid: Option<bool>,
    #[serde(default)]
    pub validation_message: Option<String>,
}

/// One element of the captured tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub style: Option<ComputedStyle>,
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub state: Option<FormState>,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_state(mut self, state: FormState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }
}

// ============================================================================
// DomSource: what the scanner needs from a node
// ============================================================================

/// Read access to an element tree.
///
/// Attribute access is fallible: a node whose attributes cannot be read is
/// skipped by the scanner without aborting the pass.
pub trait DomSource: Sized {
    fn tag_name(&self) -> &str;

    fn attributes(&self) -> Result<Vec<(String, String)>, ExtractionError>;

    /// Text of this node's own text children.
    fn own_text(&self) -> Option<&str>;

    fn style(&self) -> Option<&ComputedStyle>;

    fn rect(&self) -> Option<Rect>;

    fn form_state(&self) -> Option<&FormState>;

    fn children(&self) -> &[Self];

    /// Whitespace-normalized text of this node and its descendants, gathered
    /// until `budget` runs out.
    fn text_content(&self, budget: TextBudget) -> String {
        let mut walk = TextWalk {
            out: String::new(),
            chars: 0,
            nodes: 0,
            budget,
        };
        walk.collect(self, 0);
        walk.out
    }
}

/// Bounds for descendant text collection. Collection stops once more than
/// `max_chars` characters are gathered, below `max_depth` levels, or after
/// `max_nodes` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBudget {
    pub max_chars: usize,
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl TextBudget {
    pub fn new(max_chars: usize, max_depth: usize, max_nodes: usize) -> Self {
        Self {
            max_chars,
            max_depth,
            max_nodes: max_nodes.max(1),
        }
    }
}

struct TextWalk {
    out: String,
    chars: usize,
    nodes: usize,
    budget: TextBudget,
}

impl TextWalk {
    fn exhausted(&self) -> bool {
        self.chars > self.budget.max_chars || self.nodes >= self.budget.max_nodes
    }

    fn collect<N: DomSource>(&mut self, node: &N, depth: usize) {
        if self.exhausted() || depth > self.budget.max_depth {
            return;
        }
        self.nodes += 1;
        if let Some(text) = node.own_text() {
            for word in text.split_whitespace() {
                if self.chars > self.budget.max_chars {
                    return;
                }
                if !self.out.is_empty() {
                    self.out.push(' ');
                    self.chars += 1;
                }
                self.out.push_str(word);
                self.chars += word.chars().count();
            }
        }
        for child in node.children() {
            if self.exhausted() {
                return;
            }
            self.collect(child, depth + 1);
        }
    }
}

impl DomSource for DomNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attributes(&self) -> Result<Vec<(String, String)>, ExtractionError> {
        Ok(self.attributes.clone())
    }

    fn own_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn style(&self) -> Option<&ComputedStyle> {
        self.style.as_ref()
    }

    fn rect(&self) -> Option<Rect> {
        self.rect
    }

    fn form_state(&self) -> Option<&FormState> {
        self.state.as_ref()
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}
