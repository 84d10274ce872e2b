//! Tree serializer with the exact GnuCash formatting rules
//!
//! A small state machine (`AfterOpenTag` / `AfterCloseTag` /
//! `AfterText`) drives the serializer; the byte-level rules live in
//! policy constants and functions here so they are stated once:
//!
//! - tag and attribute names are prefix-folded from underscore form to
//!   colon form, with a fixed exclusion list of local parts that keep
//!   their literal underscore;
//! - the 29 namespace declarations on the root element;
//! - `trn:description` and string-typed `slot:value` never self-close;
//! - GUID-typed character data is lowercased and bypasses escaping;
//! - two spaces per level, with the book level flush-left and one level
//!   less inside `gnc:template-transactions`;
//! - the fixed trailing comment block.

use std::io::Write;

use crate::error::BookResult;
use crate::xml::dom::{XmlElement, XmlNode};

/// Namespace declarations injected into `<gnc-v2>` unconditionally
pub const NAMESPACES: &[(&str, &str)] = &[
    ("gnc", "http://www.gnucash.org/XML/gnc"),
    ("act", "http://www.gnucash.org/XML/act"),
    ("addr", "http://www.gnucash.org/XML/addr"),
    ("bgt", "http://www.gnucash.org/XML/bgt"),
    ("billterm", "http://www.gnucash.org/XML/billterm"),
    ("book", "http://www.gnucash.org/XML/book"),
    ("bt-days", "http://www.gnucash.org/XML/bt-days"),
    ("bt-prox", "http://www.gnucash.org/XML/bt-prox"),
    ("cd", "http://www.gnucash.org/XML/cd"),
    ("cmdty", "http://www.gnucash.org/XML/cmdty"),
    ("cust", "http://www.gnucash.org/XML/cust"),
    ("employee", "http://www.gnucash.org/XML/employee"),
    ("entry", "http://www.gnucash.org/XML/entry"),
    ("fs", "http://www.gnucash.org/XML/fs"),
    ("invoice", "http://www.gnucash.org/XML/invoice"),
    ("job", "http://www.gnucash.org/XML/job"),
    ("lot", "http://www.gnucash.org/XML/lot"),
    ("order", "http://www.gnucash.org/XML/order"),
    ("owner", "http://www.gnucash.org/XML/owner"),
    ("price", "http://www.gnucash.org/XML/price"),
    ("recurrence", "http://www.gnucash.org/XML/recurrence"),
    ("slot", "http://www.gnucash.org/XML/slot"),
    ("split", "http://www.gnucash.org/XML/split"),
    ("sx", "http://www.gnucash.org/XML/sx"),
    ("taxtable", "http://www.gnucash.org/XML/taxtable"),
    ("trn", "http://www.gnucash.org/XML/trn"),
    ("ts", "http://www.gnucash.org/XML/ts"),
    ("tte", "http://www.gnucash.org/XML/tte"),
    ("vendor", "http://www.gnucash.org/XML/vendor"),
];

// Tags whose local part keeps its literal underscore after prefix
// folding. The blanket fold turns every underscore into a colon; these
// repairs put the known local-part underscores back.
const FOLD_REPAIRS: &[(&str, &str)] = &[
    ("fs:ui:type", "fs:ui_type"),
    ("cmdty:get:quotes", "cmdty:get_quotes"),
    ("cmdty:quote:source", "cmdty:quote_source"),
    ("invoice:billing:id", "invoice:billing_id"),
    ("recurrence:period:type", "recurrence:period_type"),
];

// Comment block appended after the document, fixed width included.
const TRAILER: &str = "\n<!-- Local variables: -->\n<!-- mode: xml        -->\n<!-- End:             -->\n";

/// Fold a stored name to its wire form
///
/// Underscores become colons, then the exclusion list restores the
/// local-part underscores of the five known tags. A name already
/// carrying a colon is wire-form and passes through untouched.
pub fn fold_name(name: &str) -> String {
    if !name.contains('_') || name.contains(':') {
        return name.to_string();
    }
    let mut folded = name.replace('_', ":");
    for (wrong, right) in FOLD_REPAIRS {
        if folded == *wrong {
            folded = (*right).to_string();
        }
    }
    folded
}

// Elements that must serialize as <tag></tag> even when empty.
fn forces_explicit_empty(element: &XmlElement) -> bool {
    element.name == "trn_description"
        || (element.name == "slot_value" && element.attribute("type") == Some("string"))
}

// GUID character data is lowercased and written unescaped.
fn is_guid_content(element: &XmlElement) -> bool {
    element.attribute("type") == Some("guid")
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    AfterOpenTag,
    AfterCloseTag,
    AfterText,
}

/// The streaming serializer
pub struct XmlSerializer<W: Write> {
    out: W,
    state: WriteState,
    depth: usize,
    template_depth: usize,
    pending_open: bool,
}

impl<W: Write> XmlSerializer<W> {
    /// Create a serializer positioned at the given nesting depth
    pub fn new(out: W, depth: usize) -> Self {
        Self { out, state: WriteState::AfterCloseTag, depth, template_depth: 0, pending_open: false }
    }

    /// Serialize one element tree
    pub fn write_element(&mut self, element: &XmlElement) -> BookResult<()> {
        let template_block = element.name == "gnc_template-transactions";
        self.open_tag(element)?;
        if template_block {
            self.template_depth += 1;
        }
        let guid_content = is_guid_content(element);
        for child in &element.children {
            match child {
                XmlNode::Element(nested) => self.write_element(nested)?,
                XmlNode::Text(text) => {
                    if guid_content {
                        self.text_raw(&text.to_lowercase())?;
                    } else {
                        self.text(text)?;
                    }
                }
            }
        }
        if template_block {
            self.template_depth -= 1;
        }
        self.close_tag(element)?;
        Ok(())
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth.saturating_sub(2 + self.template_depth))
    }

    fn flush_pending(&mut self) -> BookResult<()> {
        if self.pending_open {
            self.out.write_all(b">")?;
            self.pending_open = false;
        }
        Ok(())
    }

    fn open_tag(&mut self, element: &XmlElement) -> BookResult<()> {
        self.flush_pending()?;
        match self.state {
            WriteState::AfterOpenTag | WriteState::AfterCloseTag => {
                write!(self.out, "\n{}", self.indent())?;
            }
            WriteState::AfterText => {}
        }
        write!(self.out, "<{}", fold_name(&element.name))?;
        for (name, value) in &element.attributes {
            write!(self.out, " {}=\"{}\"", fold_name(name), escape_attr(value))?;
        }
        self.pending_open = true;
        self.state = WriteState::AfterOpenTag;
        self.depth += 1;
        Ok(())
    }

    fn close_tag(&mut self, element: &XmlElement) -> BookResult<()> {
        self.depth -= 1;
        if self.pending_open {
            // Nothing was written inside the element.
            self.pending_open = false;
            if forces_explicit_empty(element) {
                write!(self.out, "></{}>", fold_name(&element.name))?;
            } else {
                self.out.write_all(b"/>")?;
            }
        } else {
            if self.state == WriteState::AfterCloseTag {
                write!(self.out, "\n{}", self.indent())?;
            }
            write!(self.out, "</{}>", fold_name(&element.name))?;
        }
        self.state = WriteState::AfterCloseTag;
        Ok(())
    }

    fn text(&mut self, text: &str) -> BookResult<()> {
        self.flush_pending()?;
        self.out.write_all(escape_text(text).as_bytes())?;
        self.state = WriteState::AfterText;
        Ok(())
    }

    fn text_raw(&mut self, text: &str) -> BookResult<()> {
        self.flush_pending()?;
        self.out.write_all(text.as_bytes())?;
        self.state = WriteState::AfterText;
        Ok(())
    }
}

/// Write a complete document: declaration, root element with the fixed
/// namespace set, the given top-level elements and the trailing comment
/// block
pub fn write_document<W: Write>(mut out: W, top_level: &[XmlElement]) -> BookResult<()> {
    out.write_all(b"<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n")?;
    out.write_all(b"<gnc-v2")?;
    for (prefix, uri) in NAMESPACES {
        write!(out, "\n     xmlns:{prefix}=\"{uri}\"")?;
    }
    out.write_all(b">")?;
    {
        let mut serializer = XmlSerializer::new(&mut out, 1);
        for element in top_level {
            serializer.write_element(element)?;
        }
    }
    out.write_all(b"\n</gnc-v2>\n")?;
    out.write_all(TRAILER.as_bytes())?;
    Ok(())
}
