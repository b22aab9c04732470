use crate::analysis::result::{ComprehensiveExtraction, FieldSummary, FormSummary, Heading, Landmark};
use crate::snapshot::extract::is_form_control;
use crate::snapshot::snapshot_model::{ElementRecord, Snapshot};

const LANDMARK_ROLES: [&str; 8] = [
    "banner",
    "navigation",
    "main",
    "complementary",
    "contentinfo",
    "search",
    "region",
    "form",
];

/// Page-level summary computed from a snapshot's flat list.
pub fn comprehensive_extraction(snapshot: &Snapshot) -> ComprehensiveExtraction {
    let flat = &snapshot.flat;
    let mut out = ComprehensiveExtraction::default();

    for (i, el) in flat.iter().enumerate() {
        let c = &el.classification;
        out.counts.total += 1;
        out.counts.interactive += c.is_interactive as usize;
        out.counts.form += c.is_form_element as usize;
        out.counts.visible += c.is_visible as usize;
        out.counts.in_viewport += c.is_in_viewport as usize;
        *out.tag_counts.entry(el.tag_name.clone()).or_insert(0) += 1;

        if el.tag_name == "a" && el.attr("href").is_some() {
            out.link_count += 1;
        }
        if let Some(level) = heading_level(&el.tag_name) {
            out.headings.push(Heading {
                level,
                text: el.text_content.clone().unwrap_or_default(),
                path: el.xpath.clone(),
            });
        }
        if let Some(role) = landmark_role(el) {
            out.landmarks.push(Landmark {
                role: role.to_string(),
                path: el.xpath.clone(),
            });
        }
        if el.tag_name == "form" {
            out.forms.push(summarize_form(flat, i));
        }
    }

    out
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

fn landmark_role(el: &ElementRecord) -> Option<&str> {
    if let Some(role) = el.attr("role").filter(|r| LANDMARK_ROLES.contains(r)) {
        return Some(role);
    }
    match el.tag_name.as_str() {
        "header" => Some("banner"),
        "nav" => Some("navigation"),
        "main" => Some("main"),
        "aside" => Some("complementary"),
        "footer" => Some("contentinfo"),
        _ => None,
    }
}

// ============================================================================
// Forms
// ============================================================================

fn summarize_form(flat: &[ElementRecord], form: usize) -> FormSummary {
    let el = &flat[form];
    let form_id = el.id();

    let fields = flat
        .iter()
        .enumerate()
        .filter(|(i, f)| {
            *i != form
                && is_form_control(&f.tag_name)
                && f.attr("type") != Some("hidden")
                && match f.attr("form") {
                    Some(owner) => Some(owner) == form_id,
                    None => is_within(flat, *i, form),
                }
        })
        .map(|(i, f)| FieldSummary {
            path: f.xpath.clone(),
            tag_name: f.tag_name.clone(),
            field_type: f.attr("type").map(str::to_string),
            name: f.attr("name").map(str::to_string),
            label: field_label(flat, i),
            required: f.state.as_ref().is_some_and(|s| s.required) || f.attr("required").is_some(),
        })
        .collect();

    FormSummary {
        path: el.xpath.clone(),
        selector: el.selector.clone(),
        id: form_id.map(str::to_string),
        action: el.attr("action").map(str::to_string),
        method: el.attr("method").unwrap_or("get").to_ascii_lowercase(),
        fields,
    }
}

fn is_within(flat: &[ElementRecord], i: usize, ancestor: usize) -> bool {
    let mut cur = flat[i].parent;
    let mut hops = 0;
    while let Some(p) = cur {
        if p == ancestor {
            return true;
        }
        hops += 1;
        if hops > flat.len() {
            return false;
        }
        cur = flat.get(p).and_then(|r| r.parent);
    }
    false
}

/// `<label for>`, then a wrapping `<label>`, then `aria-label`, then `placeholder`.
fn field_label(flat: &[ElementRecord], field: usize) -> Option<String> {
    let el = &flat[field];
    let labels = || flat.iter().enumerate().filter(|(_, l)| l.tag_name == "label");

    if let Some(id) = el.id() {
        if let Some((_, label)) = labels().find(|(_, l)| l.attr("for") == Some(id)) {
            if let Some(text) = &label.text_content {
                return Some(text.clone());
            }
        }
    }
    if let Some((_, label)) = labels().find(|(i, _)| is_within(flat, field, *i)) {
        if let Some(text) = &label.text_content {
            return Some(text.clone());
        }
    }
    el.attr("aria-label")
        .or_else(|| el.attr("placeholder"))
        .map(str::to_string)
}
