use scraper::{Html, Selector};

use crate::errors::{DeepDiverError, Result};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

pub fn parse(html: &str) -> Html {
    Html::parse_document(html)
}

/// Text of the first element matching `selector`, trimmed.
pub fn select_text(document: &Html, selector: &str) -> Result<Option<String>> {
    let sel = Selector::parse(selector).map_err(|e| {
        DeepDiverError::Content(format!("Invalid CSS selector '{}': {:?}", selector, e))
    })?;
    Ok(document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string()))
}

pub fn page_title(html: &str) -> Option<String> {
    select_text(&parse(html), "title")
        .ok()
        .flatten()
        .filter(|t| !t.is_empty())
}

/// Visible text of a document with script and style bodies dropped and all
/// whitespace runs collapsed to single spaces.
pub fn html_to_text(html: &str) -> String {
    let document = parse(html);
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html>
        <head>
            <title> Paper notes </title>
            <style>body { color: red; }</style>
        </head>
        <body>
            <h1>Title</h1>
            <p class="intro">Hello,
                world!</p>
            <script>var hidden = "nope";</script>
            <div id="main"><span>Nested</span> text</div>
        </body>
        </html>
    "#;

    #[test]
    fn test_html_to_text_drops_scripts_and_styles() {
        let text = html_to_text(SAMPLE_HTML);
        assert!(text.contains("Title Hello, world!"));
        assert!(text.contains("Nested text"));
        assert!(!text.contains("nope"));
        assert!(!text.contains("color"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title(SAMPLE_HTML).as_deref(), Some("Paper notes"));
        assert_eq!(page_title("<html><body></body></html>"), None);
    }

    #[test]
    fn test_select_text() {
        let doc = parse(SAMPLE_HTML);
        let intro = select_text(&doc, "p.intro").unwrap().unwrap();
        assert!(intro.starts_with("Hello,"));
        assert!(intro.ends_with("world!"));
        assert_eq!(select_text(&doc, "table").unwrap(), None);
        assert!(select_text(&doc, "[[[invalid").is_err());
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(html_to_text(""), "");
    }
}
