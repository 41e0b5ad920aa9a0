use crate::atom::Atom;
use crate::boxes::FourCC;
use crate::options::DEFAULT_MAX_DEPTH;
use std::collections::HashMap;

/// Produces an empty schema instance for a type code.
///
/// Implemented for any `Fn(FourCC) -> Atom`, so plain functions can be
/// registered directly and one constructor can serve several codes.
pub trait AtomFactory: Send + Sync {
    fn create(&self, typ: FourCC) -> Atom;
}

impl<F> AtomFactory for F
where
    F: Fn(FourCC) -> Atom + Send + Sync,
{
    fn create(&self, typ: FourCC) -> Atom {
        self(typ)
    }
}

/// Registry of atom schemas keyed by 4CC.
///
/// The registry is immutable once constructed; use [`Registry::with_factory`]
/// to build it fluently. Codes without an entry parse as opaque atoms.
pub struct Registry {
    map: HashMap<FourCC, FactoryEntry>,
}

struct FactoryEntry {
    inner: Box<dyn AtomFactory>,
    name: String,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with the given factory added.
    ///
    /// `name` is human-readable (e.g. "Sample Description Box") and used for display.
    pub fn with_factory(mut self, typ: FourCC, name: &str, factory: Box<dyn AtomFactory>) -> Self {
        self.map.insert(
            typ,
            FactoryEntry {
                inner: factory,
                name: name.to_string(),
            },
        );
        self
    }

    pub fn contains(&self, typ: FourCC) -> bool {
        self.map.contains_key(&typ)
    }

    pub fn name(&self, typ: FourCC) -> Option<&str> {
        self.map.get(&typ).map(|e| e.name.as_str())
    }

    /// Registered codes in sorted order.
    pub fn types(&self) -> Vec<FourCC> {
        let mut v: Vec<FourCC> = self.map.keys().copied().collect();
        v.sort();
        v
    }

    /// Empty schema instance, or `None` if the code is not registered.
    pub fn lookup(&self, typ: FourCC) -> Option<Atom> {
        self.map.get(&typ).map(|e| e.inner.create(typ))
    }

    /// Empty schema instance, falling back to an opaque atom.
    pub fn create(&self, typ: FourCC) -> Atom {
        self.lookup(typ).unwrap_or_else(|| Atom::opaque(typ))
    }

    /// Builds a fresh atom together with fresh instances of its required
    /// children, recursively. Required children without a schema are skipped:
    /// an empty opaque box would not be valid content for them.
    pub fn instantiate(&self, typ: FourCC) -> Atom {
        self.instantiate_at(typ, 1)
    }

    fn instantiate_at(&self, typ: FourCC, depth: usize) -> Atom {
        let mut atom = self.create(typ);
        if depth >= DEFAULT_MAX_DEPTH {
            return atom;
        }
        let required: Vec<FourCC> = atom
            .slots()
            .iter()
            .filter(|s| s.required && self.contains(s.typ))
            .map(|s| s.typ)
            .collect();
        for child in required {
            atom.add_child(self.instantiate_at(child, depth + 1));
        }
        atom
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in schema catalog.
pub fn default_registry() -> Registry {
    crate::catalog::register(Registry::new())
}
