//! Lightweight element tree for the codec
//!
//! Element and attribute names are stored prefix-folded: the namespace
//! colon of the wire form becomes an underscore (`act:name` is held as
//! `act_name`). The reader folds incoming names, the writer folds them
//! back; see the writer's exclusion list for the tags whose local part
//! keeps a literal underscore.

/// One node of the tree: a child element or character data
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// Nested element
    Element(XmlElement),
    /// Character data
    Text(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Prefix-folded element name, e.g. `act_name`
    pub name: String,
    /// Attributes in document order, names prefix-folded
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Builder-style: add an attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder-style: add a text child
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Builder-style: add a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Append a child element
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Append character data
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Value of an attribute by folded name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// First child element with the given folded name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// All child elements with the given folded name, in order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    /// All child elements, in order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated character data of this element
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// Text of the first child element with the given name
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|e| e.text())
    }

    /// Whether this element has any element children
    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_and_accessors() {
        let el = XmlElement::new("act_commodity")
            .with_child(XmlElement::new("cmdty_space").with_text("ISO4217"))
            .with_child(XmlElement::new("cmdty_id").with_text("EUR"));
        assert_eq!(el.child_text("cmdty_space").as_deref(), Some("ISO4217"));
        assert_eq!(el.child_text("cmdty_id").as_deref(), Some("EUR"));
        assert!(el.child("cmdty_fraction").is_none());
        assert!(el.has_elements());
    }

    #[test]
    fn test_attributes_ordered() {
        let el = XmlElement::new("slot_value").with_attr("type", "string");
        assert_eq!(el.attribute("type"), Some("string"));
        assert_eq!(el.attribute("missing"), None);
    }

    #[test]
    fn test_children_named() {
        let mut el = XmlElement::new("trn_splits");
        el.push(XmlElement::new("trn_split"));
        el.push(XmlElement::new("trn_split"));
        assert_eq!(el.children_named("trn_split").count(), 2);
    }
}
