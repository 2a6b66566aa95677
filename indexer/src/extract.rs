use scraper::Html;

#[derive(Debug, Default, PartialEq)]
pub struct Extracted {
    pub title: String,
    pub text: String,
}

/// Visible text and `<title>` of an HTML page.
pub fn extract_html(html: &str) -> Extracted {
    let doc = Html::parse_document(html);
    let mut out = Extracted::default();
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
        match parent {
            Some("title") => out.title.push_str(text.trim()),
            Some("script" | "style" | "noscript" | "template") => {}
            _ => {
                out.text.push_str(text);
                out.text.push(' ');
            }
        }
    }
    out
}

pub fn is_html(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()).as_deref(),
        Some("html" | "htm" | "xhtml")
    )
}
