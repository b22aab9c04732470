use std::collections::BTreeMap;

use crate::error::SelectorError;

// ============================================================================
// Element view: the facts a selector can test
// ============================================================================

/// Tag name and attributes of one element, as seen by selector matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementView {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
}

impl ElementView {
    pub fn new(tag: &str, attributes: BTreeMap<String, String>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes,
        }
    }

    /// View for an element whose attributes could not be read.
    pub fn bare(tag: &str) -> Self {
        Self::new(tag, BTreeMap::new())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|part| part == class))
    }
}

// ============================================================================
// Parsed selectors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrMatcher {
    name: String,
    op: Option<(AttrOp, String)>,
}

impl AttrMatcher {
    fn matches(&self, el: &ElementView) -> bool {
        let Some(actual) = el.attr(&self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.op else {
            return true;
        };
        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
            AttrOp::DashMatch => {
                actual == expected || actual.starts_with(&format!("{expected}-"))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, el: &ElementView) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && *tag != el.tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| el.has_class(c)) && self.attrs.iter().all(|a| a.matches(el))
    }
}

/// Compounds joined by combinators, left to right. The first combinator is unused.
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, el: &ElementView, ancestors: &[ElementView]) -> bool {
        let last = self.parts.len() - 1;
        self.parts[last].1.matches(el) && self.match_from(last, ancestors)
    }

    fn match_from(&self, idx: usize, ancestors: &[ElementView]) -> bool {
        if idx == 0 {
            return true;
        }
        let combinator = self.parts[idx].0;
        let prev = &self.parts[idx - 1].1;

        match combinator {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, rest)) => prev.matches(parent) && self.match_from(idx - 1, rest),
                None => false,
            },
            Combinator::Descendant => (0..ancestors.len())
                .rev()
                .any(|j| prev.matches(&ancestors[j]) && self.match_from(idx - 1, &ancestors[..j])),
        }
    }
}

/// A comma-separated selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser::new(trimmed);
        let mut selectors = Vec::new();

        loop {
            selectors.push(parser.complex()?);
            parser.skip_ws();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.bump();
                    parser.skip_ws();
                }
                Some(c) => return Err(parser.unexpected(c)),
            }
        }

        Ok(Self {
            source: trimmed.to_string(),
            selectors,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `ancestors` runs from the outermost element down to the parent.
    pub fn matches(&self, el: &ElementView, ancestors: &[ElementView]) -> bool {
        self.selectors.iter().any(|s| s.matches(el, ancestors))
    }
}

/// Parse every selector, splitting the usable ones from the failures.
pub fn parse_all(sources: &[String]) -> (Vec<SelectorList>, Vec<SelectorError>) {
    let mut parsed = Vec::new();
    let mut errors = Vec::new();
    for source in sources {
        match SelectorList::parse(source) {
            Ok(list) => parsed.push(list),
            Err(e) => errors.push(e),
        }
    }
    (parsed, errors)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            offset: self.pos,
        }
    }

    fn unsupported(&self, syntax: impl Into<String>) -> SelectorError {
        SelectorError::Unsupported {
            selector: self.source.to_string(),
            syntax: syntax.into(),
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;

        loop {
            let compound = self.compound()?;
            parts.push((combinator, compound));

            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(c @ ('+' | '~')) => return Err(self.unsupported(format!("combinator '{c}'"))),
                Some(_) if had_ws => combinator = Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            }
        }

        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.bump();
            compound.tag = Some("*".into());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident().to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    let id = self.required_ident()?;
                    compound.id = Some(id);
                }
                Some('.') => {
                    self.bump();
                    let class = self.required_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    let start = self.pos;
                    self.bump();
                    if self.peek() == Some(':') {
                        self.bump();
                    }
                    let name = self.ident();
                    let end = self.pos;
                    let syntax: String = self.chars[start..end].iter().collect();
                    return Err(self.unsupported(if name.is_empty() { ":".into() } else { syntax }));
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(SelectorError::Empty),
            };
        }
        Ok(compound)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.ident();
        if ident.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(ident)
    }

    fn attribute(&mut self) -> Result<AttrMatcher, SelectorError> {
        self.skip_ws();
        let name = self.required_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok(AttrMatcher { name, op: None });
            }
            Some('=') => {
                self.bump();
                AttrOp::Equals
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.bump();
                if self.bump() != Some('=') {
                    return Err(self.unexpected(c));
                }
                match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(SelectorError::Empty),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(SelectorError::Empty),
                    }
                }
                value
            }
            _ => self.required_ident()?,
        };

        self.skip_ws();
        match self.bump() {
            Some(']') => Ok(AttrMatcher {
                name,
                op: Some((op, value)),
            }),
            Some(c) => {
                self.pos -= 1;
                Err(self.unexpected(c))
            }
            None => Err(SelectorError::Empty),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
