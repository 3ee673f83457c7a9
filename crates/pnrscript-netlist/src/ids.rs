//! Interned identifiers and opaque placement handles.
//!
//! An [`IdString`] is an index into the [`IdStringTable`] of the context that
//! created it. It has no meaning on its own: turning it back into text always
//! requires that table. [`BelId`], [`WireId`] and [`PipId`] follow the same
//! arena+index pattern against the context's architecture.

use std::fmt;

use rustc_hash::FxHashMap;

/// An interned string.
///
/// Index 0 is always the empty string, so `IdString::default()` is a valid
/// identifier in every table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdString(u32);

impl IdString {
    /// The empty identifier.
    pub const EMPTY: IdString = IdString(0);

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    /// Resolve this identifier through `table`.
    ///
    /// Panics if the identifier was not produced by `table`; identifiers are
    /// never constructed from raw indices outside this module.
    pub fn str(self, table: &IdStringTable) -> &str {
        &table.strings[self.0 as usize]
    }
}

/// Interning table owned by a context.
#[derive(Debug, Clone)]
pub struct IdStringTable {
    strings: Vec<Box<str>>,
    index: FxHashMap<Box<str>, IdString>,
}

impl IdStringTable {
    pub fn new() -> Self {
        let mut table = Self {
            strings: Vec::new(),
            index: FxHashMap::default(),
        };
        table.intern("");
        table
    }

    /// Return the identifier for `s`, interning it if needed.
    pub fn intern(&mut self, s: &str) -> IdString {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = IdString(self.strings.len() as u32);
        self.strings.push(s.into());
        self.index.insert(s.into(), id);
        id
    }

    /// Look up `s` without interning.
    pub fn lookup(&self, s: &str) -> Option<IdString> {
        self.index.get(s).copied()
    }

    pub fn resolve(&self, id: IdString) -> Option<&str> {
        self.strings.get(id.0 as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // The empty string is always present.
        false
    }
}

impl Default for IdStringTable {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! arch_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self::new(index)
            }
        }
    };
}

arch_handle!(
    /// A placement site, as enumerated by the architecture.
    BelId,
    "bel"
);
arch_handle!(
    /// A routing node, as enumerated by the architecture.
    WireId,
    "wire"
);
arch_handle!(
    /// A programmable connection between two wires.
    PipId,
    "pip"
);
