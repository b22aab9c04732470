use crate::snapshot::snapshot_model::SnapshotTree;

const PREVIEW_CHARS: usize = 40;

/// Indented one-line-per-element rendering of a snapshot tree.
///
/// ```text
/// form#login.auth [form]
///   input#email [interactive form] "me@example.com"
/// ```
pub fn format_tree(tree: &SnapshotTree) -> String {
    let mut out = String::new();
    write_node(tree, 0, &mut out);
    out
}

fn write_node(tree: &SnapshotTree, indent: usize, out: &mut String) {
    let el = &tree.element;
    out.push_str(&"  ".repeat(indent));
    out.push_str(&el.label());

    let mut flags = Vec::new();
    if el.classification.is_interactive {
        flags.push("interactive");
    }
    if el.classification.is_form_element {
        flags.push("form");
    }
    if !el.classification.is_visible {
        flags.push("hidden");
    }
    if !flags.is_empty() {
        out.push_str(&format!(" [{}]", flags.join(" ")));
    }

    if let Some(text) = &el.text_content {
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        out.push_str(&format!(" \"{preview}\""));
    }
    out.push('\n');

    for child in &tree.children {
        write_node(child, indent + 1, out);
    }
}
