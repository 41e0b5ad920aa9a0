use crate::atom::{Atom, close_open_ended};
use crate::boxes::{BoxHeader, FourCC, SizeForm};
use crate::error::{FormatError, Result};
use crate::options::ParseOptions;
use crate::registry::{Registry, default_registry};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use tracing::debug;

/// State threaded through a recursive parse.
pub(crate) struct ReadContext<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) options: &'a ParseOptions,
    /// Depth of the atom about to be read; top-level atoms are at depth 1.
    pub(crate) depth: usize,
    pub(crate) parent: Option<FourCC>,
}

impl<'a> ReadContext<'a> {
    pub(crate) fn new(registry: &'a Registry, options: &'a ParseOptions) -> Self {
        Self {
            registry,
            options,
            depth: 1,
            parent: None,
        }
    }

    pub(crate) fn nested(&self, parent: FourCC) -> ReadContext<'a> {
        ReadContext {
            registry: self.registry,
            options: self.options,
            depth: self.depth + 1,
            parent: Some(parent),
        }
    }
}

/// Reads a box header at the cursor. `end` bounds the enclosing budget.
pub fn read_box_header(cur: &mut Cursor<&[u8]>, end: u64) -> Result<BoxHeader> {
    let start = cur.position();
    let avail = end.saturating_sub(start);
    if avail < 8 {
        return Err(FormatError::Truncated {
            what: "box header".into(),
            needed: 8,
            available: avail,
        }
        .into());
    }
    let size32 = cur.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    cur.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    let (size, header_size, form) = match size32 {
        1 => {
            if avail < 16 {
                cur.set_position(start);
                return Err(FormatError::Truncated {
                    what: format!("large size of '{typ}'"),
                    needed: 16,
                    available: avail,
                }
                .into());
            }
            (cur.read_u64::<BigEndian>()?, 16, SizeForm::Large)
        }
        0 => (avail, 8, SizeForm::ToEnd),
        n => (n as u64, 8, SizeForm::Compact),
    };

    if size < header_size {
        cur.set_position(start);
        return Err(FormatError::InvalidSize { typ, size }.into());
    }
    if size > avail {
        cur.set_position(start);
        return Err(FormatError::Truncated {
            what: format!("box '{typ}'"),
            needed: size,
            available: avail,
        }
        .into());
    }

    Ok(BoxHeader { size, typ, header_size, start, form })
}

pub fn write_box_header<W: Write>(w: &mut W, typ: FourCC, size: u64, form: SizeForm) -> Result<()> {
    match form {
        SizeForm::Compact => w.write_u32::<BigEndian>(size as u32)?,
        SizeForm::Large => w.write_u32::<BigEndian>(1)?,
        SizeForm::ToEnd => w.write_u32::<BigEndian>(0)?,
    }
    w.write_all(&typ.0)?;
    if form == SizeForm::Large {
        w.write_u64::<BigEndian>(size)?;
    }
    Ok(())
}

/// Reads one box: header, registry dispatch, payload.
pub(crate) fn read_atom(cur: &mut Cursor<&[u8]>, end: u64, ctx: &ReadContext<'_>) -> Result<Atom> {
    if ctx.depth > ctx.options.max_depth {
        return Err(FormatError::DepthLimit {
            depth: ctx.depth,
            max: ctx.options.max_depth,
        }
        .into());
    }
    let h = read_box_header(cur, end)?;
    let mut atom = match ctx.registry.lookup(h.typ) {
        Some(a) => a,
        None => {
            debug!(typ = %h.typ, parent = ?ctx.parent, "no schema, keeping payload opaque");
            Atom::opaque(h.typ)
        }
    };
    debug!(typ = %h.typ, size = h.size, offset = h.start, depth = ctx.depth, "atom");
    atom.read_payload(cur, h.payload_len(), ctx)?;
    atom.set_read_form(h.form);
    Ok(atom)
}

/// Parses exactly one box spanning all of `bytes`.
pub fn parse_tree(bytes: &[u8]) -> Result<Atom> {
    parse_tree_with(bytes, &default_registry(), &ParseOptions::default())
}

pub fn parse_tree_with(bytes: &[u8], registry: &Registry, options: &ParseOptions) -> Result<Atom> {
    let end = bytes.len() as u64;
    let mut cur = Cursor::new(bytes);
    let atom = read_atom(&mut cur, end, &ReadContext::new(registry, options))?;
    if cur.position() != end {
        return Err(FormatError::TrailingData {
            offset: 0,
            remaining: end - cur.position(),
        }
        .into());
    }
    Ok(atom)
}

/// Parses a sequence of top-level boxes, e.g. a whole file.
pub fn parse_atoms(bytes: &[u8]) -> Result<Vec<Atom>> {
    parse_atoms_with(bytes, &default_registry(), &ParseOptions::default())
}

pub fn parse_atoms_with(bytes: &[u8], registry: &Registry, options: &ParseOptions) -> Result<Vec<Atom>> {
    let end = bytes.len() as u64;
    let mut cur = Cursor::new(bytes);
    let ctx = ReadContext::new(registry, options);
    let mut atoms = Vec::new();
    while cur.position() < end {
        atoms.push(read_atom(&mut cur, end, &ctx)?);
    }
    Ok(atoms)
}

/// Generates (when stale) and serializes one tree.
pub fn serialize_tree(atom: &mut Atom) -> Result<Vec<u8>> {
    atom.to_bytes()
}

pub fn serialize_atoms(atoms: &mut [Atom]) -> Result<Vec<u8>> {
    close_open_ended(atoms);
    let mut out = Vec::with_capacity(atoms.iter().map(|a| a.size() as usize).sum());
    for a in atoms.iter_mut() {
        a.write(&mut out)?;
    }
    Ok(out)
}
