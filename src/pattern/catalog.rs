use crate::pattern::pattern_model::PatternDefinition;

fn definition(name: &str, pattern_type: &str, selectors: &[&str], recommendations: &[&str]) -> PatternDefinition {
    PatternDefinition {
        name: name.to_string(),
        pattern_type: pattern_type.to_string(),
        selectors: selectors.iter().map(|s| s.to_string()).collect(),
        recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
    }
}

/// Built-in pattern library.
pub fn default_catalog() -> Vec<PatternDefinition> {
    vec![
        definition(
            "login_form",
            "form",
            &[
                "form input[type=\"password\"]",
                "form input[type=\"email\"]",
                "form input[name*=\"user\"]",
                "form button[type=\"submit\"]",
            ],
            &[
                "Locate credential fields by name or type, not position",
                "Assert the error message after a failed submit",
            ],
        ),
        definition(
            "navigation_menu",
            "navigation",
            &["nav", "[role=\"navigation\"]", "nav ul > li > a", ".navbar", ".menu"],
            &[
                "Check every link target resolves",
                "Verify the active item is marked with aria-current",
            ],
        ),
        definition(
            "data_table",
            "table",
            &["table", "table thead th", "table tbody tr", "[role=\"grid\"]"],
            &[
                "Address cells by header text instead of column index",
                "Cover sorting and pagination if present",
            ],
        ),
        definition(
            "modal",
            "overlay",
            &[
                "[role=\"dialog\"]",
                "[aria-modal=\"true\"]",
                ".modal",
                "dialog",
            ],
            &[
                "Wait for the dialog to open before interacting",
                "Verify focus is trapped and Escape closes it",
            ],
        ),
        definition(
            "accordion",
            "disclosure",
            &[
                "details > summary",
                "[aria-expanded]",
                ".accordion",
                "[data-toggle=\"collapse\"]",
            ],
            &[
                "Toggle each section and assert aria-expanded follows",
            ],
        ),
        definition(
            "search_box",
            "search",
            &[
                "input[type=\"search\"]",
                "[role=\"search\"]",
                "form[action*=\"search\"]",
                "input[name=\"q\"]",
            ],
            &[
                "Cover empty, single-result and no-result queries",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::selector::SelectorList;

    #[test]
    fn every_catalog_selector_parses() {
        for def in default_catalog() {
            for selector in &def.selectors {
                assert!(
                    SelectorList::parse(selector).is_ok(),
                    "{}: selector '{}' should parse",
                    def.name,
                    selector
                );
            }
        }
    }
}
