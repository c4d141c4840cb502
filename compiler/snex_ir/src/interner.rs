//! Per-unit string interner.
//!
//! Every compilation unit owns one interner, created fresh for the compile
//! and dropped with the unit, so interned strings are reclaimed when a
//! script is recompiled. There is no sharing between units and therefore
//! no locking.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::Name;

/// String interner mapping identifier text to [`Name`] handles.
#[derive(Clone, Debug)]
pub struct StringInterner {
    map: FxHashMap<Arc<str>, Name>,
    strings: Vec<Arc<str>>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    /// Create an interner holding only the empty string.
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        let mut map = FxHashMap::default();
        map.insert(Arc::clone(&empty), Name::EMPTY);
        StringInterner {
            map,
            strings: vec![empty],
        }
    }

    /// Intern `s`, returning the existing handle when already present.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&name) = self.map.get(s) {
            return name;
        }
        let name = Name::from_raw(u32::try_from(self.strings.len()).unwrap_or(u32::MAX));
        let owned: Arc<str> = Arc::from(s);
        self.strings.push(Arc::clone(&owned));
        self.map.insert(owned, name);
        name
    }

    /// Look up a handle without interning.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.map.get(s).copied()
    }

    /// Text of an interned name. Unknown handles resolve to `""`.
    pub fn lookup(&self, name: Name) -> &str {
        self.strings.get(name.index()).map_or("", |s| s)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut interner = StringInterner::new();
        let a = interner.intern("gain");
        let b = interner.intern("gain");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "gain");
    }

    #[test]
    fn test_empty_is_preinterned() {
        let mut interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert!(interner.is_empty());
    }

    #[test]
    fn test_distinct_names() {
        let mut interner = StringInterner::new();
        let a = interner.intern("left");
        let b = interner.intern("right");
        assert_ne!(a, b);
        assert_eq!(interner.get("right"), Some(b));
        assert_eq!(interner.get("center"), None);
    }
}
