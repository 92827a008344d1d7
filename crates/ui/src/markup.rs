//! Minimal HTML tree with escaped rendering.

use std::fmt::{self, Write as _};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Fragment(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn style(self, value: impl Into<String>) -> Self {
        self.attr("style", value)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| *attr == name)
            .map(|(_, value)| value.as_str())
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

impl Node {
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Concatenated text of this subtree, unescaped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => element.children.iter().for_each(|c| c.collect_text(out)),
            Node::Fragment(nodes) => nodes.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// Depth-first list of elements matching `predicate`.
    pub fn find_all<'a>(&'a self, predicate: &dyn Fn(&Element) -> bool) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.walk(predicate, &mut found);
        found
    }

    fn walk<'a>(&'a self, predicate: &dyn Fn(&Element) -> bool, found: &mut Vec<&'a Element>) {
        let children = match self {
            Node::Text(_) => return,
            Node::Element(element) => {
                if predicate(element) {
                    found.push(element);
                }
                &element.children
            }
            Node::Fragment(nodes) => nodes,
        };
        for child in children {
            child.walk(predicate, found);
        }
    }
}

fn escape(raw: &str, out: &mut impl fmt::Write) -> fmt::Result {
    for ch in raw.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            '\'' => out.write_str("&#39;")?,
            other => out.write_char(other)?,
        }
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => escape(text, f),
            Node::Element(element) => fmt::Display::fmt(element, f),
            Node::Fragment(nodes) => nodes.iter().try_for_each(|node| fmt::Display::fmt(node, f)),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attrs {
            write!(f, " {name}=\"")?;
            escape(value, f)?;
            f.write_char('"')?;
        }
        f.write_char('>')?;
        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }
        write!(f, "</{}>", self.tag)
    }
}
