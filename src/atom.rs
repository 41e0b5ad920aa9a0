//! The atom tree.
//!
//! An [`Atom`] is a schema (ordered properties plus declared child slots)
//! together with the children it owns. Wire layout is exactly the property
//! order followed by the children in order; nothing is reordered on write.

use crate::boxes::{FourCC, SizeForm};
use crate::codec::{self, ReadContext};
use crate::error::{Error, FormatError, Result};
use crate::options::ParseOptions;
use crate::path::AtomPath;
use crate::property::{BlobStyle, Property, ResolveContext};
use crate::registry::Registry;
use std::io::{Cursor, Write};
use tracing::warn;

/// Whether derived and default values are current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomState {
    /// Parsed or mutated since the last generation pass.
    Populated,
    /// Generation ran and nothing was touched afterwards.
    Generated,
}

/// A child type an atom expects to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSlot {
    pub typ: FourCC,
    pub required: bool,
    pub only_one: bool,
}

#[derive(Debug, Clone)]
pub struct Atom {
    typ: FourCC,
    properties: Vec<Property>,
    slots: Vec<ChildSlot>,
    children: Vec<Atom>,
    form: SizeForm,
    state: AtomState,
    opaque: bool,
    children_changed: bool,
}

impl Atom {
    /// An empty schema for `typ`, with no properties and no child slots.
    pub fn new(typ: FourCC) -> Self {
        Self {
            typ,
            properties: Vec::new(),
            slots: Vec::new(),
            children: Vec::new(),
            form: SizeForm::Compact,
            state: AtomState::Populated,
            opaque: false,
            children_changed: false,
        }
    }

    /// Fallback for type codes without a schema: the payload is kept verbatim.
    pub fn opaque(typ: FourCC) -> Self {
        let mut a = Self::raw(typ);
        a.opaque = true;
        a
    }

    /// A schema whose whole payload is a single `data` blob.
    pub fn raw(typ: FourCC) -> Self {
        Self::new(typ).with_property(Property::blob("data", BlobStyle::ToEnd))
    }

    // ---------- schema definition ----------

    pub fn with_property(mut self, p: Property) -> Self {
        self.add_property(p);
        self
    }

    pub fn with_child_slot(mut self, typ: &[u8; 4], required: bool, only_one: bool) -> Self {
        self.add_child_slot(FourCC(*typ), required, only_one);
        self
    }

    pub fn add_property(&mut self, p: Property) {
        self.properties.push(p);
    }

    pub fn add_child_slot(&mut self, typ: FourCC, required: bool, only_one: bool) {
        self.slots.push(ChildSlot {
            typ,
            required,
            only_one,
        });
    }

    // ---------- introspection ----------

    pub fn typ(&self) -> FourCC {
        self.typ
    }

    pub fn state(&self) -> AtomState {
        self.state
    }

    pub fn is_generated(&self) -> bool {
        self.state == AtomState::Generated
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn form(&self) -> SizeForm {
        self.form
    }

    pub fn set_form(&mut self, form: SizeForm) {
        self.form = form;
        self.touch();
    }

    pub fn slots(&self) -> &[ChildSlot] {
        &self.slots
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn children(&self) -> &[Atom] {
        &self.children
    }

    /// Raw payload of an opaque or raw atom.
    pub fn payload(&self) -> Option<&[u8]> {
        self.property("data").and_then(|p| p.bytes_value().ok())
    }

    fn touch(&mut self) {
        self.state = AtomState::Populated;
    }

    // ---------- properties ----------

    /// Looks up a semantic property. Reserved blocks are not exposed.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name() == name && !p.is_reserved())
    }

    /// Mutable lookup; a hit marks this atom as needing generation.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        let p = self
            .properties
            .iter_mut()
            .find(|p| p.name() == name && !p.is_reserved())?;
        self.state = AtomState::Populated;
        Some(p)
    }

    fn require(&self, name: &str) -> Result<&Property> {
        self.property(name).ok_or_else(|| Error::PropertyNotFound {
            typ: self.typ,
            name: name.to_string(),
        })
    }

    fn require_mut(&mut self, name: &str) -> Result<&mut Property> {
        let typ = self.typ;
        self.property_mut(name).ok_or_else(|| Error::PropertyNotFound {
            typ,
            name: name.to_string(),
        })
    }

    pub fn integer(&self, name: &str) -> Result<u64> {
        self.require(name)?.integer_value()
    }

    pub fn set_integer(&mut self, name: &str, v: u64) -> Result<()> {
        self.require_mut(name)?.set_integer(v)
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8]> {
        self.require(name)?.bytes_value()
    }

    pub fn set_bytes(&mut self, name: &str, v: &[u8]) -> Result<()> {
        self.require_mut(name)?.set_bytes(v)
    }

    /// Blob value decoded as UTF-8 (lossy).
    pub fn string(&self, name: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(self.bytes(name)?).into_owned())
    }

    pub fn set_string(&mut self, name: &str, v: &str) -> Result<()> {
        self.set_bytes(name, v.as_bytes())
    }

    pub fn rows(&self, name: &str) -> Result<&[Vec<u64>]> {
        self.require(name)?.rows_value()
    }

    pub fn set_rows(&mut self, name: &str, rows: Vec<Vec<u64>>) -> Result<()> {
        self.require_mut(name)?.set_rows(rows)
    }

    // ---------- children ----------

    /// First child of the given type.
    pub fn child(&self, typ: &[u8; 4]) -> Option<&Atom> {
        self.child_at(FourCC(*typ), 0)
    }

    pub fn child_mut(&mut self, typ: &[u8; 4]) -> Option<&mut Atom> {
        self.child_at_mut(FourCC(*typ), 0)
    }

    /// `index`-th child of the given type.
    pub fn child_at(&self, typ: FourCC, index: usize) -> Option<&Atom> {
        self.children.iter().filter(|c| c.typ == typ).nth(index)
    }

    pub fn child_at_mut(&mut self, typ: FourCC, index: usize) -> Option<&mut Atom> {
        let c = self.children.iter_mut().filter(|c| c.typ == typ).nth(index)?;
        self.state = AtomState::Populated;
        Some(c)
    }

    pub fn children_mut(&mut self) -> &mut Vec<Atom> {
        self.touch();
        self.children_changed = true;
        &mut self.children
    }

    pub fn add_child(&mut self, child: Atom) {
        self.touch();
        self.children_changed = true;
        self.children.push(child);
    }

    /// Removes and returns the `index`-th child of the given type.
    pub fn remove_child(&mut self, typ: FourCC, index: usize) -> Option<Atom> {
        let pos = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.typ == typ)
            .nth(index)
            .map(|(i, _)| i)?;
        self.touch();
        self.children_changed = true;
        Some(self.children.remove(pos))
    }

    /// Resolves a dotted child path such as `trak[1].mdia.minf`.
    /// An empty path names this atom.
    pub fn find(&self, path: &str) -> Result<&Atom> {
        let parsed: AtomPath = path.parse()?;
        let mut cur = self;
        for seg in parsed.segments() {
            cur = cur
                .child_at(seg.typ, seg.index)
                .ok_or_else(|| Error::AtomNotFound(path.to_string()))?;
        }
        Ok(cur)
    }

    /// Mutable [`Atom::find`]; every atom on the way is marked for regeneration.
    pub fn find_mut(&mut self, path: &str) -> Result<&mut Atom> {
        let parsed: AtomPath = path.parse()?;
        let mut cur = self;
        for seg in parsed.segments() {
            cur = cur
                .child_at_mut(seg.typ, seg.index)
                .ok_or_else(|| Error::AtomNotFound(path.to_string()))?;
        }
        Ok(cur)
    }

    /// Resolves `atom.path.propertyName` relative to this atom.
    pub fn property_at(&self, path: &str) -> Result<&Property> {
        let (atoms, name) = crate::path::split_property_path(path)?;
        self.find(atoms)?.require(name)
    }

    pub fn property_at_mut(&mut self, path: &str) -> Result<&mut Property> {
        let (atoms, name) = crate::path::split_property_path(path)?;
        self.find_mut(atoms)?.require_mut(name)
    }

    /// Depth-first pre-order visit; `self` is at depth 0.
    pub fn walk<F: FnMut(&Atom, usize)>(&self, f: &mut F) {
        self.walk_at(0, f);
    }

    fn walk_at<F: FnMut(&Atom, usize)>(&self, depth: usize, f: &mut F) {
        f(self, depth);
        for c in &self.children {
            c.walk_at(depth + 1, f);
        }
    }

    // ---------- generation ----------

    /// Resolves default and derived values, children first.
    ///
    /// Fails when a derived value does not fit its field; the atom then stays
    /// [`AtomState::Populated`].
    pub fn generate(&mut self) -> Result<()> {
        close_open_ended(&mut self.children);
        for c in &mut self.children {
            c.generate()?;
        }
        let ctx = ResolveContext {
            child_count: self.children.len(),
            children_changed: self.children_changed,
        };
        for p in &mut self.properties {
            p.resolve_default(&ctx)?;
        }
        self.children_changed = false;
        self.state = AtomState::Generated;
        Ok(())
    }

    // ---------- sizes ----------

    /// Bytes of properties and children, without the header.
    pub fn payload_size(&self) -> u64 {
        self.properties.iter().map(Property::size).sum::<u64>()
            + self.children.iter().map(Atom::size).sum::<u64>()
    }

    pub fn header_size(&self) -> u64 {
        self.effective_form(self.payload_size()).header_len()
    }

    /// Total wire size including the header.
    pub fn size(&self) -> u64 {
        let body = self.payload_size();
        self.effective_form(body).header_len() + body
    }

    fn effective_form(&self, body: u64) -> SizeForm {
        match self.form {
            SizeForm::Compact if body + 8 > u32::MAX as u64 => SizeForm::Large,
            f => f,
        }
    }

    // ---------- codec ----------

    /// Reads a complete box (header included) into this schema.
    ///
    /// On failure the atom keeps its previous contents.
    pub fn read(
        &mut self,
        cur: &mut Cursor<&[u8]>,
        registry: &Registry,
        options: &ParseOptions,
    ) -> Result<()> {
        let end = cur.get_ref().len() as u64;
        let start = cur.position();
        let hdr = codec::read_box_header(cur, end)?;
        if hdr.typ != self.typ {
            cur.set_position(start);
            return Err(FormatError::TypeMismatch {
                expected: self.typ,
                found: hdr.typ,
            }
            .into());
        }
        let ctx = ReadContext::new(registry, options);
        if let Err(e) = self.read_payload(cur, hdr.payload_len(), &ctx) {
            cur.set_position(start);
            return Err(e);
        }
        self.form = hdr.form;
        Ok(())
    }

    /// Reads the payload once the header has been consumed by the caller.
    ///
    /// Properties are read in declared order, then children until exactly
    /// `payload_len` bytes are used.
    pub(crate) fn read_payload(
        &mut self,
        cur: &mut Cursor<&[u8]>,
        payload_len: u64,
        ctx: &ReadContext<'_>,
    ) -> Result<()> {
        let start = cur.position();
        let end = start + payload_len;

        let mut props = self.properties.clone();
        for p in props.iter_mut() {
            let limit = end - cur.position();
            p.read(cur, limit)?;
        }

        let mut children = Vec::new();
        let nested = ctx.nested(self.typ);
        while cur.position() < end {
            let left = end - cur.position();
            if left < 8 {
                return Err(FormatError::SizeMismatch {
                    typ: self.typ,
                    declared: payload_len,
                    consumed: payload_len - left,
                }
                .into());
            }
            children.push(codec::read_atom(cur, end, &nested)?);
        }

        let consumed = cur.position() - start;
        if consumed != payload_len {
            return Err(FormatError::SizeMismatch {
                typ: self.typ,
                declared: payload_len,
                consumed,
            }
            .into());
        }

        self.check_slots(&children, ctx.options.strict_children)?;
        self.properties = props;
        self.children = children;
        self.children_changed = false;
        self.state = AtomState::Populated;
        Ok(())
    }

    fn check_slots(&self, children: &[Atom], strict: bool) -> Result<()> {
        for slot in &self.slots {
            let count = children.iter().filter(|c| c.typ == slot.typ).count();
            let problem = if slot.required && count == 0 {
                Some(FormatError::MissingChild {
                    parent: self.typ,
                    child: slot.typ,
                })
            } else if slot.only_one && count > 1 {
                Some(FormatError::DuplicateChild {
                    parent: self.typ,
                    child: slot.typ,
                    count,
                })
            } else {
                None
            };
            if let Some(p) = problem {
                if strict {
                    return Err(p.into());
                }
                warn!("{p}");
            }
        }
        Ok(())
    }

    pub(crate) fn set_read_form(&mut self, form: SizeForm) {
        self.form = form;
    }

    /// Generates if needed, then writes the whole box.
    pub fn write<W: Write>(&mut self, w: &mut W) -> Result<()> {
        if !self.is_generated() {
            self.generate()?;
        }
        self.encode(w)
    }

    /// Writes the box without generating; fails if values are stale.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        if !self.is_generated() {
            return Err(Error::NotGenerated(self.typ));
        }
        let body = self.payload_size();
        let form = self.effective_form(body);
        codec::write_box_header(w, self.typ, form.header_len() + body, form)?;
        for p in &self.properties {
            p.write(w)?;
        }
        for c in &self.children {
            c.encode(w)?;
        }
        Ok(())
    }

    /// Generates if needed and returns the encoded box.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size() as usize);
        self.write(&mut out)?;
        Ok(out)
    }
}

/// Only the last atom of a level may keep a size-0 header; earlier ones
/// would swallow their following siblings when read back.
pub(crate) fn close_open_ended(atoms: &mut [Atom]) {
    let n = atoms.len();
    for a in atoms.iter_mut().take(n.saturating_sub(1)) {
        if a.form == SizeForm::ToEnd {
            a.form = SizeForm::Compact;
        }
    }
}
