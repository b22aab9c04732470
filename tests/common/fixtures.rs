use dom_analyzer::dom::dom_model::{
    ComputedStyle, DomNode, DomPage, DomSource, FormState, PageInfo, Rect,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use dom_analyzer::error::ExtractionError;

// =========================================================================
// Page builders
// =========================================================================

pub fn page(root: DomNode) -> DomPage {
    DomPage {
        url: Some("https://example.test/".into()),
        title: Some("Fixture".into()),
        viewport: None,
        root,
    }
}

pub fn info() -> PageInfo {
    PageInfo {
        url: Some("https://example.test/".into()),
        ..Default::default()
    }
}

/// `<html><body>...children</body></html>`
pub fn document(children: Vec<DomNode>) -> DomNode {
    let body = children
        .into_iter()
        .fold(DomNode::new("body"), |body, c| body.child(c));
    DomNode::new("html").child(body)
}

pub fn login_form() -> DomNode {
    DomNode::new("form")
        .attr("id", "login")
        .attr("action", "/session")
        .child(DomNode::new("label").attr("for", "email").text("Email"))
        .child(
            DomNode::new("input")
                .attr("id", "email")
                .attr("type", "email")
                .attr("name", "email"),
        )
        .child(DomNode::new("label").attr("for", "password").text("Password"))
        .child(
            DomNode::new("input")
                .attr("id", "password")
                .attr("type", "password")
                .attr("name", "password"),
        )
        .child(DomNode::new("button").attr("type", "submit").text("Sign in"))
}

pub fn list(items: &[&str]) -> DomNode {
    items.iter().fold(DomNode::new("ul").attr("class", "items"), |ul, text| {
        ul.child(DomNode::new("li").attr("class", "item").text(text))
    })
}

pub fn value_state(value: &str) -> FormState {
    FormState {
        value: Some(value.into()),
        ..Default::default()
    }
}

pub fn hidden_style() -> ComputedStyle {
    ComputedStyle {
        display: Some("none".into()),
        ..Default::default()
    }
}

pub fn rect(width: f64, height: f64) -> Rect {
    Rect {
        x: 0.0,
        y: 0.0,
        width,
        height,
    }
}

/// A flat `<div>` holding `n` `<p>` children.
pub fn wide_tree(n: usize) -> DomNode {
    (0..n).fold(DomNode::new("div"), |div, i| {
        div.child(DomNode::new("p").text(&format!("paragraph {i}")))
    })
}

/// A chain of nested `<div>`s, `depth` levels below the root.
pub fn deep_tree(depth: usize) -> DomNode {
    (0..depth).fold(DomNode::new("span").text("leaf"), |inner, _| {
        DomNode::new("div").child(inner)
    })
}

// =========================================================================
// A node whose attributes can fail to read
// =========================================================================

#[derive(Debug, Clone)]
pub struct FaultyNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub broken: bool,
    pub children: Vec<FaultyNode>,
    pub text_reads: Option<Rc<Cell<usize>>>,
    pub child_delay: Option<Duration>,
}

impl FaultyNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.into(),
            attributes: vec![],
            text: None,
            broken: false,
            children: vec![],
            text_reads: None,
            child_delay: None,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub fn child(mut self, child: FaultyNode) -> Self {
        self.children.push(child);
        self
    }

    /// Count every read of this node's own text into `reads`.
    pub fn counted(mut self, reads: &Rc<Cell<usize>>) -> Self {
        self.text_reads = Some(Rc::clone(reads));
        self
    }

    /// Sleep for `delay` whenever the children are listed.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.child_delay = Some(delay);
        self
    }
}

impl DomSource for FaultyNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attributes(&self) -> Result<Vec<(String, String)>, ExtractionError> {
        if self.broken {
            Err(ExtractionError::new(&self.tag, "attribute getter threw"))
        } else {
            Ok(self.attributes.clone())
        }
    }

    fn own_text(&self) -> Option<&str> {
        if let Some(reads) = &self.text_reads {
            reads.set(reads.get() + 1);
        }
        self.text.as_deref()
    }

    fn style(&self) -> Option<&ComputedStyle> {
        None
    }

    fn rect(&self) -> Option<Rect> {
        None
    }

    fn form_state(&self) -> Option<&FormState> {
        None
    }

    fn children(&self) -> &[Self] {
        if let Some(delay) = self.child_delay {
            std::thread::sleep(delay);
        }
        &self.children
    }
}
