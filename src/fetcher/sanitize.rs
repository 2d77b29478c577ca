//! Reduce a fetched web page to readable text.

use scraper::{ElementRef, Html};

/// Elements whose whole subtree is boilerplate or non-prose.
const BOILERPLATE_TAGS: &[&str] = &[
    "head", "script", "style", "nav", "header", "footer", "pre", "code", "noscript", "template",
];

/// Parse raw page bytes and keep the text outside boilerplate regions.
pub fn clean_html(raw: &[u8]) -> String {
    let html: String = raw.utf8_chunks().map(|chunk| chunk.valid()).collect();
    let document = Html::parse_document(&html);

    let mut chunks = Vec::new();
    collect_text(document.root_element(), &mut chunks);

    chunks
        .iter()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_text<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !BOILERPLATE_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push(text);
        }
    }
}
