pub mod atom;
pub mod boxes;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod file;
pub mod json;
pub mod options;
pub mod path;
pub mod property;
pub mod registry;
pub mod util;

pub use atom::{Atom, AtomState, ChildSlot};
pub use boxes::{BoxHeader, FourCC, SizeForm};
pub use codec::{parse_atoms, parse_atoms_with, parse_tree, parse_tree_with, serialize_atoms, serialize_tree};
pub use error::{Error, FormatError, Result};
pub use file::AtomFile;
pub use options::ParseOptions;
pub use property::{BlobStyle, Column, IntWidth, Origin, Property, PropertyKind, PropertyValue, TableCount};
pub use registry::{AtomFactory, Registry, default_registry};
