//! A small element tree, rendered to HTML text.

use evolugrid_common::value_tools::escape_html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Text, escaped on output.
    Text(String),
    /// Markup, written as-is.
    Raw(String),
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Add classes, ignoring blank input.
    pub fn class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn add_class(&mut self, class: &str) {
        let class = class.trim();
        if class.is_empty() {
            return;
        }
        let joined = match self.get_attr("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn raw(self, markup: impl Into<String>) -> Self {
        self.child(Node::Raw(markup.into()))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .map(|c| c.split_whitespace().any(|x| x == class))
            .unwrap_or(false)
    }

    /// All descendant elements with the given tag, depth first.
    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        let mut ret = Vec::new();
        for c in &self.children {
            if let Node::Element(e) = c {
                if e.tag == tag {
                    ret.push(e);
                }
                ret.extend(e.find_all(tag));
            }
        }
        ret
    }

    /// First descendant element carrying the class.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        for c in &self.children {
            if let Node::Element(e) = c {
                if e.has_class(class) {
                    return Some(e);
                }
                if let Some(found) = e.find_class(class) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Concatenated text content, markup included verbatim.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            match c {
                Node::Element(e) => out.push_str(&e.text_content()),
                Node::Text(t) | Node::Raw(t) => out.push_str(t),
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (n, v) in &self.attributes {
            out.push(' ');
            out.push_str(n);
            out.push_str("=\"");
            out.push_str(&escape_html(v));
            out.push('"');
        }
        out.push('>');

        for c in &self.children {
            match c {
                Node::Element(e) => e.write_html(out),
                Node::Text(t) => out.push_str(&escape_html(t)),
                Node::Raw(r) => out.push_str(r),
            }
        }

        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_output() {
        let td = Element::new("td")
            .class("name")
            .class("")
            .class("bold")
            .text("<Ann>")
            .raw("<br>");

        assert_eq!(td.to_html(), "<td class=\"name bold\">&lt;Ann&gt;<br></td>");
        assert!(td.has_class("bold"));
    }

    #[test]
    fn searching() {
        let table = Element::new("table").child(
            Element::new("tbody")
                .child(Element::new("tr").child(Element::new("td").text("a")))
                .child(Element::new("tr").class("x")),
        );

        assert_eq!(table.find_all("tr").len(), 2);
        assert_eq!(table.find_class("x").map(|e| e.tag.as_str()), Some("tr"));
        assert_eq!(table.text_content(), "a");
    }
}
