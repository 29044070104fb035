//! Source bytes kept alongside a decoded model value.
//!
//! Parts are decoded into a small model and written back from it. Whatever
//! the model does not cover would be lost on save, so decoders keep the
//! element's original bytes next to the value they decoded. Writers emit those
//! bytes while the value still matches and fall back to regenerating XML once
//! it has been changed.

use std::fmt;

/// An element's source bytes together with the value decoded from them.
///
/// `Retained<()>` holds plain passthrough content that has no model at all.
/// Comparison ignores the retained bytes: two shapes are equal when their
/// modelled fields are.
#[derive(Clone)]
pub struct Retained<T = ()> {
    source: Option<Box<(T, Vec<u8>)>>,
}

impl<T> Retained<T> {
    pub fn new(value: T, raw: Vec<u8>) -> Self {
        Self {
            source: Some(Box::new((value, raw))),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    /// Decoded value and source bytes.
    pub fn source(&self) -> Option<(&T, &[u8])> {
        self.source.as_deref().map(|(value, raw)| (value, raw.as_slice()))
    }

    /// Source bytes regardless of the current value.
    pub fn raw(&self) -> Option<&[u8]> {
        self.source.as_deref().map(|(_, raw)| raw.as_slice())
    }
}

impl<T: PartialEq> Retained<T> {
    /// Source bytes, as long as `current` still equals the decoded value.
    pub fn get(&self, current: &T) -> Option<&[u8]> {
        match self.source.as_deref() {
            Some((value, raw)) if value == current => Some(raw),
            _ => None,
        }
    }
}

impl Retained<()> {
    pub fn from_raw(raw: Vec<u8>) -> Self {
        Self::new((), raw)
    }

    /// Append more source bytes, keeping document order.
    pub fn extend(&mut self, raw: &[u8]) {
        match self.source.as_deref_mut() {
            Some((_, bytes)) => bytes.extend_from_slice(raw),
            None => *self = Self::from_raw(raw.to_vec()),
        }
    }
}

impl<T> Default for Retained<T> {
    fn default() -> Self {
        Self { source: None }
    }
}

impl<T> PartialEq for Retained<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Retained<T> {}

impl<T> fmt::Debug for Retained<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw() {
            Some(raw) => write!(f, "Retained({} bytes)", raw.len()),
            None => f.write_str("Retained(none)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_follow_the_value() {
        let kept = Retained::new(Some("rect".to_string()), b"<a:prstGeom prst=\"rect\"/>".to_vec());
        assert!(kept.get(&Some("rect".to_string())).is_some());
        assert!(kept.get(&Some("ellipse".to_string())).is_none());
        assert!(kept.raw().is_some());
        assert!(Retained::<u32>::default().get(&0).is_none());
    }

    #[test]
    fn test_extend_passthrough() {
        let mut tail = Retained::default();
        assert!(tail.is_empty());
        tail.extend(b"<a:ln/>");
        tail.extend(b"<a:effectLst/>");
        assert_eq!(tail.raw(), Some(&b"<a:ln/><a:effectLst/>"[..]));
        assert_eq!(tail, Retained::default());
    }
}
