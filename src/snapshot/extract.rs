use std::collections::BTreeMap;

use crate::dom::dom_model::{ComputedStyle, DomSource, FormState, TextBudget};
use crate::identity::keys::TEST_ID_ATTRIBUTES;
use crate::snapshot::snapshot_model::{ElementState, SnapshotOptions};

const FORM_TAGS: [&str; 12] = [
    "form", "input", "select", "textarea", "button", "fieldset", "legend", "label", "option",
    "optgroup", "datalist", "output",
];

const INTERACTIVE_ROLES: [&str; 14] = [
    "button", "link", "checkbox", "radio", "tab", "menuitem", "menuitemcheckbox",
    "menuitemradio", "option", "switch", "textbox", "combobox", "slider", "searchbox",
];

/// Attributes kept even when attribute extraction is turned off.
const IDENTITY_ATTRIBUTES: [&str; 8] = ["id", "class", "name", "type", "role", "for", "form", "href"];

const ELLIPSIS: &str = "...";

/// Facts derived from the tag name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagTraits {
    pub form_element: bool,
    pub natively_interactive: bool,
}

pub fn tag_traits(tag: &str) -> TagTraits {
    TagTraits {
        form_element: FORM_TAGS.contains(&tag),
        natively_interactive: matches!(
            tag,
            "a" | "button" | "input" | "select" | "textarea" | "details" | "summary" | "option"
        ),
    }
}

pub fn is_form_control(tag: &str) -> bool {
    matches!(tag, "input" | "select" | "textarea" | "button" | "output" | "fieldset")
}

pub fn is_interactive(tag: &str, attributes: &BTreeMap<String, String>, traits: TagTraits) -> bool {
    if traits.natively_interactive {
        return match tag {
            "a" => attributes.contains_key("href"),
            "input" => attributes.get("type").map(String::as_str) != Some("hidden"),
            _ => true,
        };
    }

    if attributes
        .get("role")
        .is_some_and(|r| INTERACTIVE_ROLES.contains(&r.as_str()))
    {
        return true;
    }
    if attributes
        .get("tabindex")
        .and_then(|t| t.trim().parse::<i32>().ok())
        .is_some_and(|t| t >= 0)
    {
        return true;
    }
    if attributes
        .get("contenteditable")
        .is_some_and(|v| v.is_empty() || v == "true")
    {
        return true;
    }
    attributes.contains_key("onclick")
}

pub fn is_hidden(style: Option<&ComputedStyle>, attributes: &BTreeMap<String, String>) -> bool {
    attributes.contains_key("hidden")
        || attributes.get("type").map(String::as_str) == Some("hidden")
        || style.is_some_and(ComputedStyle::is_hidden)
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Deduplicate (first occurrence wins), lowercase names and truncate values.
pub fn prepare_attributes(raw: &[(String, String)], options: &SnapshotOptions) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in raw {
        let name = name.to_ascii_lowercase();
        if out.contains_key(&name) {
            continue;
        }
        if !options.include_attributes && !keeps_identity(&name) {
            continue;
        }
        out.insert(name, truncate(value, options.max_attribute_length));
    }
    out
}

fn keeps_identity(name: &str) -> bool {
    IDENTITY_ATTRIBUTES.contains(&name)
        || TEST_ID_ATTRIBUTES.contains(&name)
        || name.starts_with("aria-")
}

/// Type-aware text: controls report value or placeholder, links their text
/// or title or href, images their alt or title.
pub fn extract_text<N: DomSource>(
    node: &N,
    tag: &str,
    attributes: &BTreeMap<String, String>,
    state: Option<&ElementState>,
    budget: TextBudget,
) -> Option<String> {
    let attr = |name: &str| {
        attributes
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let text = match tag {
        "input" | "textarea" | "select" => state
            .and_then(|s| s.value.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| attr("value"))
            .or_else(|| attr("placeholder")),
        "img" => attr("alt").or_else(|| attr("title")),
        "a" => non_empty(node.text_content(budget))
            .or_else(|| attr("title"))
            .or_else(|| attr("href")),
        _ => non_empty(node.text_content(budget)),
    };

    text.map(|t| truncate(&t, budget.max_chars))
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Current state of a form element; `None` for everything else.
pub fn resolve_state(
    tag: &str,
    attributes: &BTreeMap<String, String>,
    live: Option<&FormState>,
) -> Option<ElementState> {
    if !matches!(tag, "input" | "select" | "textarea" | "option" | "button") {
        return None;
    }
    let live = live.cloned().unwrap_or_default();
    let checkable = matches!(
        attributes.get("type").map(String::as_str),
        Some("checkbox") | Some("radio")
    );

    Some(ElementState {
        value: live.value.or_else(|| attributes.get("value").cloned()),
        checked: live
            .checked
            .or_else(|| checkable.then(|| attributes.contains_key("checked"))),
        selected: live
            .selected
            .or_else(|| (tag == "option").then(|| attributes.contains_key("selected"))),
        disabled: live
            .disabled
            .unwrap_or_else(|| attributes.contains_key("disabled")),
        required: attributes.contains_key("required"),
        valid: live.valid,
        validation_message: live.validation_message.filter(|m| !m.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::dom_model::DomNode;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn budget(max_chars: usize) -> TextBudget {
        TextBudget::new(max_chars, 15, 1000)
    }

    #[test]
    fn links_fall_back_to_title_then_href() {
        let node = DomNode::new("a");
        let a = attrs(&[("href", "/docs"), ("title", "Docs")]);
        assert_eq!(extract_text(&node, "a", &a, None, budget(100)), Some("Docs".into()));

        let a = attrs(&[("href", "/docs")]);
        assert_eq!(extract_text(&node, "a", &a, None, budget(100)), Some("/docs".into()));
    }

    #[test]
    fn inputs_report_value_before_placeholder() {
        let node = DomNode::new("input");
        let a = attrs(&[("placeholder", "Email")]);
        assert_eq!(extract_text(&node, "input", &a, None, budget(100)), Some("Email".into()));

        let state = ElementState {
            value: Some("me@example.com".into()),
            ..Default::default()
        };
        assert_eq!(
            extract_text(&node, "input", &a, Some(&state), budget(100)),
            Some("me@example.com".into())
        );
    }

    #[test]
    fn descendant_text_stops_at_the_budget() {
        let mut list = DomNode::new("ul");
        for i in 0..500 {
            list = list.child(DomNode::new("li").text(&format!("item {i}")));
        }
        let text = extract_text(&list, "ul", &attrs(&[]), None, budget(20)).unwrap();
        assert_eq!(text, "item 0 item 1 item 2...");

        let deep = DomNode::new("div").child(DomNode::new("p").child(DomNode::new("span").text("deep")));
        let shallow = TextBudget::new(100, 1, 1000);
        assert_eq!(extract_text(&deep, "div", &attrs(&[]), None, shallow), None);

        let few_nodes = TextBudget::new(100, 15, 3);
        assert_eq!(
            extract_text(&list, "ul", &attrs(&[]), None, few_nodes),
            Some("item 0 item 1".into())
        );
    }

    #[test]
    fn truncation_marks_cut() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn hidden_inputs_are_not_interactive() {
        let traits = tag_traits("input");
        assert!(!is_interactive("input", &attrs(&[("type", "hidden")]), traits));
        assert!(is_interactive("input", &attrs(&[("type", "text")]), traits));
        assert!(is_interactive("div", &attrs(&[("role", "button")]), tag_traits("div")));
        assert!(!is_interactive("a", &attrs(&[]), tag_traits("a")));
    }
}
