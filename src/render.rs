// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Turns the HTML fragments in coffee descriptions into terminal text.

use scraper::{ElementRef, Html, Node};

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "ul", "ol", "li", "tr", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "head", "title"];

/// Collapses whitespace the way a browser would, breaks lines around block
/// elements and at `<br>`, and prefixes list items with a dash. Entities are
/// decoded by the parser, which also recovers from malformed markup.
pub(crate) fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    walk(fragment.root_element(), &mut out);

    out.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        // LINT: Comments, doctypes and processing instructions carry no text.
        #[allow(clippy::wildcard_enum_match_arm)]
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    visit(child, out);
                }
            }
            _ => {}
        }
    }
}

fn visit(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_ELEMENTS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        break_line(out);
    }
    if name == "li" {
        out.push_str("- ");
    }
    walk(element, out);
    if block {
        break_line(out);
    }
}

fn break_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !out.is_empty() && !out.ends_with([' ', '\n']) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}
