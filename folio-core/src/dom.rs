//! In-memory document tree the page pipeline renders into.
//!
//! A [`Document`] wraps a parsed [`scraper::Html`] tree. The section renderers
//! and the contact form mutate it through the [`Dom`] trait, and it is written
//! back out with [`Document::to_html`]. Lookups hand out [`NodeId`] handles
//! wrapped in `Option`, so a missing target is always something the caller
//! checks.

use ego_tree::NodeRef;
use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Doctype, Element, Text};
use scraper::{ElementRef, Html, Node, Selector};

pub use ego_tree::NodeId;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Options for [`Dom::create_element`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementOptions<'a> {
    pub class_name: Option<&'a str>,
    /// Raw inner markup. Parsed as-is and never sanitized, so only pass
    /// first-party content here.
    pub html: Option<&'a str>,
}

/// Tree-mutation interface the renderers and the form controller work against.
pub trait Dom {
    /// First element in document order matching a CSS selector. An invalid
    /// selector matches nothing.
    fn select_one(&self, selector: &str) -> Option<NodeId>;
    /// Lowercase tag name, `None` for anything that isn't an element.
    fn tag_name(&self, id: NodeId) -> Option<&str>;
    fn attribute(&self, id: NodeId, name: &str) -> Option<&str>;
    fn children(&self, id: NodeId) -> Vec<NodeId>;
    fn text_content(&self, id: NodeId) -> String;
    fn create_element(&mut self, tag: &str, opts: ElementOptions<'_>) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn prepend_child(&mut self, parent: NodeId, child: NodeId);
    fn clear_children(&mut self, id: NodeId);
    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str);

    fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        let quoted = element_id.replace('\\', "\\\\").replace('"', "\\\"");
        self.select_one(&format!("[id=\"{quoted}\"]"))
    }

    /// Child elements of `id`, skipping text and comments.
    fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|c| self.tag_name(*c).is_some())
            .collect()
    }

    fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node);
        }
    }

    /// Replaces the text of the element with the given id. No-op when absent.
    fn set_text(&mut self, element_id: &str, text: &str) {
        if let Some(id) = self.get_element_by_id(element_id) {
            self.set_text_content(id, text);
        }
    }

    fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, id: NodeId, class: &str) {
        if self.tag_name(id).is_none() || self.has_class(id, class) {
            return;
        }
        let joined = match self.attribute(id, "class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", &joined);
    }

    fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let joined = self
            .attribute(id, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &joined);
    }

    /// Current value of a form control: text for `<textarea>`, the `value`
    /// attribute for everything else.
    fn value(&self, id: NodeId) -> String {
        match self.tag_name(id) {
            Some("textarea") => self.text_content(id),
            Some(_) => self.attribute(id, "value").unwrap_or_default().to_string(),
            None => String::new(),
        }
    }

    fn set_value(&mut self, id: NodeId, value: &str) {
        let is_textarea = match self.tag_name(id) {
            Some(tag) => tag == "textarea",
            None => return,
        };
        if is_textarea {
            self.set_text_content(id, value);
        } else {
            self.set_attribute(id, "value", value);
        }
    }

    /// Materializes a tagged builder as a detached subtree.
    fn build(&mut self, el: El) -> NodeId {
        let id = self.create_element(&el.tag, ElementOptions::default());
        for (name, value) in &el.attrs {
            self.set_attribute(id, name, value);
        }
        for child in el.children {
            let child_id = match child {
                Child::Element(inner) => self.build(inner),
                Child::Text(text) => self.create_text(&text),
            };
            self.append_child(id, child_id);
        }
        id
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
        }
    }

    /// Parses a full HTML document, such as the page skeleton.
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.html.tree.get(id)?.parent().map(|p| p.id())
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id)?.value().as_element()
    }

    fn doctype(&self) -> Option<&Doctype> {
        self.html
            .tree
            .root()
            .children()
            .find_map(|child| child.value().as_doctype())
    }

    /// Serializes the whole document.
    pub fn to_html(&self) -> String {
        let html = self.html.html();
        // The serializer only writes the doctype name
        match self.doctype() {
            Some(doctype) if !doctype.public_id().is_empty() || !doctype.system_id().is_empty() => {
                let short = format!("<!DOCTYPE {}>", doctype.name());
                html.replacen(&short, &doctype_markup(doctype), 1)
            }
            _ => html,
        }
    }

    /// Serializes one node and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        match node.value() {
            Node::Element(_) => ElementRef::wrap(node).map(|el| el.html()).unwrap_or_default(),
            Node::Text(text) => html_escape::encode_text(&**text).into_owned(),
            _ => String::new(),
        }
    }
}

fn doctype_markup(doctype: &Doctype) -> String {
    let mut out = format!("<!DOCTYPE {}", doctype.name());
    if !doctype.public_id().is_empty() {
        out.push_str(&format!(r#" PUBLIC "{}""#, doctype.public_id()));
    } else if !doctype.system_id().is_empty() {
        out.push_str(" SYSTEM");
    }
    if !doctype.system_id().is_empty() {
        out.push_str(&format!(r#" "{}""#, doctype.system_id()));
    }
    out.push('>');
    out
}

fn qual_name(ns: &str, local: &str) -> QualName {
    QualName::new(None, Namespace::from(ns), LocalName::from(local))
}

impl Dom for Document {
    fn select_one(&self, selector: &str) -> Option<NodeId> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("Ignoring selector {selector:?}: {e}");
                return None;
            }
        };

        // Detached nodes stay in the arena, so only search from the root
        self.html
            .tree
            .root()
            .children()
            .filter_map(ElementRef::wrap)
            .find_map(|top| {
                if parsed.matches(&top) {
                    Some(top.id())
                } else {
                    top.select(&parsed).next().map(|el| el.id())
                }
            })
    }

    fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| node.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    fn create_element(&mut self, tag: &str, opts: ElementOptions<'_>) -> NodeId {
        let mut attrs = Vec::new();
        if let Some(class_name) = opts.class_name.filter(|c| !c.is_empty()) {
            attrs.push(Attribute {
                name: qual_name("", "class"),
                value: StrTendril::from_slice(class_name),
            });
        }
        let element = Element::new(qual_name(HTML_NAMESPACE, &tag.to_ascii_lowercase()), attrs);
        let id = self.html.tree.orphan(Node::Element(element)).id();

        if let Some(markup) = opts.html.filter(|m| !m.is_empty()) {
            let fragment = Html::parse_fragment(markup);
            let fragment_root = self.html.tree.extend_tree(fragment.tree).id();
            // Fragments parse under a synthetic <html> wrapper
            let parsed: Vec<NodeId> = self
                .node(fragment_root)
                .and_then(|root| root.children().find(|c| c.value().is_element()))
                .map(|wrapper| wrapper.children().map(|c| c.id()).collect())
                .unwrap_or_default();
            for child in parsed {
                self.append_child(id, child);
            }
        }

        id
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let text = Text {
            text: scraper::StrTendril::from_slice(text),
        };
        self.html.tree.orphan(Node::Text(text)).id()
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(child).is_none() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(parent) {
            node.append_id(child);
        }
    }

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(child).is_none() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(parent) {
            node.prepend_id(child);
        }
    }

    fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            if let Some(mut node) = self.html.tree.get_mut(child) {
                node.detach();
            }
        }
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(current) = self.element(id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let mut attrs: Vec<Attribute> = current
            .attrs
            .iter()
            .map(|(qname, value)| Attribute {
                name: qname.clone(),
                value: StrTendril::from_slice(value),
            })
            .collect();
        match attrs
            .iter_mut()
            .find(|attr| attr.name.ns.is_empty() && &*attr.name.local == name)
        {
            Some(attr) => attr.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: qual_name("", &name),
                value: StrTendril::from_slice(value),
            }),
        }
        // Rebuilt rather than edited in place: the element caches its id and classes
        let element = Element::new(current.name.clone(), attrs);
        if let Some(mut node) = self.html.tree.get_mut(id) {
            *node.value() = Node::Element(element);
        }
    }
}

/// Tagged element builder. Text and attribute values are escaped when the
/// document is serialized, so data never turns into markup.
#[derive(Debug, Clone)]
pub struct El {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Child>,
}

#[derive(Debug, Clone)]
enum Child {
    Element(El),
    Text(String),
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(Child::Element(child));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>x</title></head>
<body>
  <main>
    <h1 id="name">placeholder</h1>
    <ul id="skills" class="list inline"><li>old</li></ul>
    <form id="contact-form">
      <small class="error" data-error-for="cf-name"></small>
      <textarea id="cf-message">hello</textarea>
      <input id="cf-name" value="Ana">
    </form>
  </main>
</body></html>"#;

    #[test]
    fn select_one_by_id_tag_class_and_attribute() {
        let doc = Document::parse(PAGE);

        let name = doc.select_one("#name").unwrap();
        assert_eq!(doc.text_content(name), "placeholder");

        assert!(doc.select_one("main").is_some());
        assert_eq!(doc.select_one("ul.inline"), doc.select_one("#skills"));
        let small = doc.select_one(r#"[data-error-for="cf-name"]"#).unwrap();
        assert_eq!(doc.tag_name(small), Some("small"));
        assert!(doc.select_one("#missing").is_none());
    }

    #[test]
    fn select_one_supports_combinators() {
        let doc = Document::parse(PAGE);

        let scoped = doc
            .select_one(r#"#contact-form [data-error-for="cf-name"]"#)
            .unwrap();
        assert_eq!(doc.tag_name(scoped), Some("small"));
        assert_eq!(doc.select_one("main > ul"), doc.select_one("#skills"));
        assert!(doc.select_one("#skills > small").is_none());
    }

    #[test]
    fn invalid_selector_yields_none() {
        let doc = Document::parse(PAGE);
        assert!(doc.select_one("").is_none());
        assert!(doc.select_one("#").is_none());
        assert!(doc.select_one("<li>").is_none());
    }

    #[test]
    fn cleared_nodes_are_no_longer_found() {
        let mut doc = Document::parse(PAGE);
        let main = doc.select_one("main").unwrap();
        doc.clear_children(main);

        assert!(doc.select_one("#name").is_none());
        assert!(doc.get_element_by_id("skills").is_none());
    }

    #[test]
    fn set_text_replaces_content_and_ignores_missing_ids() {
        let mut doc = Document::parse(PAGE);
        doc.set_text("name", "Ada Lovelace");
        doc.set_text("nope", "ignored");

        let name = doc.get_element_by_id("name").unwrap();
        assert_eq!(doc.text_content(name), "Ada Lovelace");
        assert_eq!(doc.children(name).len(), 1);
    }

    #[test]
    fn create_element_with_class_and_raw_markup() {
        let mut doc = Document::new();
        let el = doc.create_element(
            "div",
            ElementOptions {
                class_name: Some("alert error"),
                html: Some("Fallo <strong>grave</strong>"),
            },
        );

        assert!(doc.has_class(el, "alert"));
        assert!(doc.has_class(el, "error"));
        assert_eq!(doc.text_content(el), "Fallo grave");
        assert_eq!(
            doc.outer_html(el),
            r#"<div class="alert error">Fallo <strong>grave</strong></div>"#
        );
    }

    #[test]
    fn builder_output_is_escaped() {
        let mut doc = Document::new();
        let el = doc.build(
            El::new("p")
                .attr("title", "a \"quote\"")
                .text("<script>alert(1)</script>"),
        );

        assert_eq!(
            doc.outer_html(el),
            r#"<p title="a &quot;quote&quot;">&lt;script&gt;alert(1)&lt;/script&gt;</p>"#
        );
    }

    #[test]
    fn class_list_add_and_remove() {
        let mut doc = Document::parse(PAGE);
        let ul = doc.get_element_by_id("skills").unwrap();

        doc.add_class(ul, "error-text");
        doc.add_class(ul, "error-text");
        assert_eq!(doc.attribute(ul, "class"), Some("list inline error-text"));
        assert_eq!(doc.select_one(".error-text"), Some(ul));

        doc.remove_class(ul, "inline");
        assert_eq!(doc.attribute(ul, "class"), Some("list error-text"));
        assert!(doc.select_one(".inline").is_none());
    }

    #[test]
    fn prepend_and_clear_children() {
        let mut doc = Document::parse(PAGE);
        let ul = doc.get_element_by_id("skills").unwrap();
        let first = doc.build(El::new("li").text("first"));
        doc.prepend_child(ul, first);
        assert_eq!(doc.child_elements(ul)[0], first);
        assert_eq!(doc.parent(first), Some(ul));

        doc.clear_children(ul);
        assert!(doc.children(ul).is_empty());
        assert_eq!(doc.parent(first), None);
    }

    #[test]
    fn form_values_read_inputs_and_textareas() {
        let mut doc = Document::parse(PAGE);
        let input = doc.get_element_by_id("cf-name").unwrap();
        let textarea = doc.get_element_by_id("cf-message").unwrap();

        assert_eq!(doc.value(input), "Ana");
        assert_eq!(doc.value(textarea), "hello");

        doc.set_value(input, "Bea");
        doc.set_value(textarea, "otro mensaje");
        assert_eq!(doc.value(input), "Bea");
        assert_eq!(doc.value(textarea), "otro mensaje");
    }

    #[test]
    fn serializes_void_elements_without_closing_tag() {
        let doc = Document::parse(PAGE);
        let html = doc.to_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"value="Ana""#));
        assert!(html.contains("<input "));
        assert!(!html.contains("</input>"));
    }

    #[test]
    fn round_trip_keeps_doctype_ids_and_foreign_attributes() {
        let doctype = concat!(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "#,
            r#""http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#,
        );
        let doc = Document::parse(&format!(
            r##"{doctype}
<html><head></head><body><svg><use xlink:href="#icon"></use></svg></body></html>"##
        ));
        let html = doc.to_html();

        assert!(html.starts_with(doctype));
        assert!(html.contains(r##"<use xlink:href="#icon">"##));
    }
}
