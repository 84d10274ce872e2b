//! Key/value extension attributes
//!
//! Slots attach user-defined or GnuCash-internal metadata to accounts,
//! transactions, business entities and lots. Order is significant for
//! the codec, so slot lists are vectors rather than maps.

use chrono::{DateTime, FixedOffset, NaiveDate};

use cashbook_math::Fraction;

use crate::guid::Guid;

/// A single key/value attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Attribute key, e.g. `notes` or `gncInvoice`
    pub key: String,
    /// Attribute value
    pub value: SlotValue,
}

impl Slot {
    /// Create a slot from key and value
    pub fn new(key: impl Into<String>, value: SlotValue) -> Self {
        Self { key: key.into(), value }
    }
}

/// The typed value of a slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    /// Free-form text (`type="string"`)
    Text(String),
    /// Integer (`type="integer"`)
    Integer(i64),
    /// Exact rational (`type="numeric"`)
    Numeric(Fraction),
    /// Entity reference (`type="guid"`)
    Guid(Guid),
    /// Calendar date (`type="gdate"`)
    GDate(NaiveDate),
    /// Timestamp (`type="timespec"`)
    Timespec(DateTime<FixedOffset>),
    /// Nested slot list (`type="frame"`)
    Frame(Vec<Slot>),
}

impl SlotValue {
    /// The `type` attribute this value serializes with
    pub fn type_name(&self) -> &'static str {
        match self {
            SlotValue::Text(_) => "string",
            SlotValue::Integer(_) => "integer",
            SlotValue::Numeric(_) => "numeric",
            SlotValue::Guid(_) => "guid",
            SlotValue::GDate(_) => "gdate",
            SlotValue::Timespec(_) => "timespec",
            SlotValue::Frame(_) => "frame",
        }
    }
}

/// Helpers shared by every entity that carries a slot list
pub trait SlotHolder {
    /// The slot list
    fn slots(&self) -> &[Slot];

    /// The mutable slot list
    fn slots_mut(&mut self) -> &mut Vec<Slot>;

    /// Find a slot by key
    fn slot(&self, key: &str) -> Option<&SlotValue> {
        self.slots().iter().find(|s| s.key == key).map(|s| &s.value)
    }

    /// Set or replace a slot by key
    fn set_slot(&mut self, key: &str, value: SlotValue) {
        match self.slots().iter().position(|s| s.key == key) {
            Some(idx) => self.slots_mut()[idx].value = value,
            None => self.slots_mut().push(Slot::new(key, value)),
        }
    }

    /// Remove a slot by key, returning its value
    fn remove_slot(&mut self, key: &str) -> Option<SlotValue> {
        let slots = self.slots_mut();
        let idx = slots.iter().position(|s| s.key == key)?;
        Some(slots.remove(idx).value)
    }

    /// Text value of a slot, when present and string-typed
    fn text_slot(&self, key: &str) -> Option<&str> {
        match self.slot(key) {
            Some(SlotValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Holder {
        slots: Vec<Slot>,
    }

    impl SlotHolder for Holder {
        fn slots(&self) -> &[Slot] {
            &self.slots
        }
        fn slots_mut(&mut self) -> &mut Vec<Slot> {
            &mut self.slots
        }
    }

    #[test]
    fn test_set_and_get_slot() {
        let mut holder = Holder { slots: Vec::new() };
        holder.set_slot("notes", SlotValue::Text("hello".into()));
        assert_eq!(holder.text_slot("notes"), Some("hello"));

        holder.set_slot("notes", SlotValue::Text("replaced".into()));
        assert_eq!(holder.slots().len(), 1);
        assert_eq!(holder.text_slot("notes"), Some("replaced"));
    }

    #[test]
    fn test_remove_slot() {
        let mut holder = Holder { slots: Vec::new() };
        holder.set_slot("placeholder", SlotValue::Text("true".into()));
        assert!(holder.remove_slot("placeholder").is_some());
        assert!(holder.slot("placeholder").is_none());
        assert!(holder.remove_slot("placeholder").is_none());
    }

    #[test]
    fn test_frame_nesting() {
        let frame = SlotValue::Frame(vec![Slot::new(
            "invoice-guid",
            SlotValue::Guid(Guid::parse("0123456789abcdef0123456789abcdef").unwrap()),
        )]);
        assert_eq!(frame.type_name(), "frame");
    }

    #[test]
    fn test_order_preserved() {
        let mut holder = Holder { slots: Vec::new() };
        holder.set_slot("b", SlotValue::Integer(2));
        holder.set_slot("a", SlotValue::Integer(1));
        let keys: Vec<_> = holder.slots().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
