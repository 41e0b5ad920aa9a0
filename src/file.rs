use crate::atom::Atom;
use crate::codec::{parse_atoms_with, serialize_atoms};
use crate::error::{Error, Result};
use crate::options::ParseOptions;
use crate::path::split_property_path;
use crate::property::Property;
use crate::registry::{Registry, default_registry};
use std::path::Path;
use tracing::info;

/// The top-level atoms of a file, loaded into memory.
///
/// Paths given to [`AtomFile::find`] start at the top level, e.g.
/// `moov.trak[0].mdia.minf.stbl.stsd`. Storing rewrites the whole file;
/// chunk offsets are not adjusted if `moov` changes size in front of `mdat`.
#[derive(Debug, Clone, Default)]
pub struct AtomFile {
    atoms: Vec<Atom>,
}

impl AtomFile {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &default_registry(), &ParseOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, registry: &Registry, options: &ParseOptions) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let atoms = parse_atoms_with(&bytes, registry, options)?;
        info!(path = %path.as_ref().display(), atoms = atoms.len(), bytes = bytes.len(), "loaded");
        Ok(Self { atoms })
    }

    /// Serializes everything first, so a failure leaves the file untouched.
    pub fn store(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!(path = %path.as_ref().display(), bytes = bytes.len(), "stored");
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        serialize_atoms(&mut self.atoms)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut Vec<Atom> {
        &mut self.atoms
    }

    pub fn into_atoms(self) -> Vec<Atom> {
        self.atoms
    }

    pub fn find(&self, path: &str) -> Result<&Atom> {
        let (root, rest) = self.split_root(path)?;
        let typ = root.typ;
        self.atoms
            .iter()
            .filter(|a| a.typ() == typ)
            .nth(root.index)
            .ok_or_else(|| Error::AtomNotFound(path.to_string()))?
            .find(rest)
            .map_err(|e| widen_not_found(e, path))
    }

    pub fn find_mut(&mut self, path: &str) -> Result<&mut Atom> {
        let (root, rest) = self.split_root(path)?;
        let typ = root.typ;
        self.atoms
            .iter_mut()
            .filter(|a| a.typ() == typ)
            .nth(root.index)
            .ok_or_else(|| Error::AtomNotFound(path.to_string()))?
            .find_mut(rest)
            .map_err(|e| widen_not_found(e, path))
    }

    /// Resolves `top.level.path.propertyName`.
    pub fn property(&self, path: &str) -> Result<&Property> {
        let (atoms, name) = split_property_path(path)?;
        let atom = self.find(atoms)?;
        atom.property(name).ok_or_else(|| Error::PropertyNotFound {
            typ: atom.typ(),
            name: name.to_string(),
        })
    }

    pub fn property_mut(&mut self, path: &str) -> Result<&mut Property> {
        let (atoms, name) = split_property_path(path)?;
        let atom = self.find_mut(atoms)?;
        let typ = atom.typ();
        atom.property_mut(name).ok_or_else(|| Error::PropertyNotFound {
            typ,
            name: name.to_string(),
        })
    }

    fn split_root<'p>(&self, path: &'p str) -> Result<(crate::path::Segment, &'p str)> {
        let (first, rest) = path.split_once('.').unwrap_or((path, ""));
        let parsed: crate::path::AtomPath = first.parse()?;
        match parsed.segments() {
            [seg] => Ok((*seg, rest)),
            _ => Err(Error::InvalidPath(path.to_string())),
        }
    }
}

/// Reports lookups below the root with the full path.
fn widen_not_found(e: Error, path: &str) -> Error {
    match e {
        Error::AtomNotFound(_) => Error::AtomNotFound(path.to_string()),
        other => other,
    }
}
