//! Typed fields of an atom payload.
//!
//! A [`Property`] has a name, a wire shape fixed at construction, and a value.
//! The set of shapes is closed ([`PropertyKind`]) and every read/write path
//! matches on it exhaustively.

use crate::error::{Error, FormatError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use tracing::{trace, warn};

/// Width of an unsigned big-endian integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    U8,
    U16,
    U24,
    U32,
    U64,
}

impl IntWidth {
    pub fn bytes(self) -> u64 {
        match self {
            IntWidth::U8 => 1,
            IntWidth::U16 => 2,
            IntWidth::U24 => 3,
            IntWidth::U32 => 4,
            IntWidth::U64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub fn max(self) -> u64 {
        match self {
            IntWidth::U64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }

    fn read(self, r: &mut impl Read) -> std::io::Result<u64> {
        Ok(match self {
            IntWidth::U8 => r.read_u8()? as u64,
            IntWidth::U16 => r.read_u16::<BigEndian>()? as u64,
            IntWidth::U24 => r.read_u24::<BigEndian>()? as u64,
            IntWidth::U32 => r.read_u32::<BigEndian>()? as u64,
            IntWidth::U64 => r.read_u64::<BigEndian>()?,
        })
    }

    fn write(self, w: &mut impl Write, v: u64) -> std::io::Result<()> {
        match self {
            IntWidth::U8 => w.write_u8(v as u8),
            IntWidth::U16 => w.write_u16::<BigEndian>(v as u16),
            IntWidth::U24 => w.write_u24::<BigEndian>(v as u32),
            IntWidth::U32 => w.write_u32::<BigEndian>(v as u32),
            IntWidth::U64 => w.write_u64::<BigEndian>(v),
        }
    }
}

/// How a blob determines its length on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStyle {
    /// Exactly `n` bytes.
    Fixed(usize),
    /// Length prefix of the given width, then that many bytes.
    Prefixed(IntWidth),
    /// Bytes up to and including a NUL terminator (the NUL is not part of the value).
    NullTerminated,
    /// Everything left in the enclosing atom's budget.
    ToEnd,
}

/// How a table determines its row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCount {
    /// Count prefix of the given width. Always written as the current row count.
    Prefixed(IntWidth),
    /// Rows fill the rest of the enclosing atom's budget.
    ToEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub width: IntWidth,
}

impl Column {
    pub fn new(name: &str, width: IntWidth) -> Self {
        Self {
            name: name.to_string(),
            width,
        }
    }
}

/// Rule applied to an integer during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    /// Fill in this constant unless the value was read or explicitly set.
    Default(u64),
    /// Always the number of children of the owning atom.
    ChildCount,
}

/// Where the current value of a property came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Unset,
    Read,
    Set,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Integer {
        width: IntWidth,
        value: u64,
        rule: Option<ValueRule>,
    },
    Reserved {
        len: usize,
    },
    Blob {
        style: BlobStyle,
        value: Vec<u8>,
    },
    Table {
        count: TableCount,
        columns: Vec<Column>,
        rows: Vec<Vec<u64>>,
    },
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKind::Integer { .. } => "integer",
            PropertyKind::Reserved { .. } => "reserved",
            PropertyKind::Blob { .. } => "blob",
            PropertyKind::Table { .. } => "table",
        }
    }
}

/// Borrowed view of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValue<'a> {
    Integer(u64),
    Bytes(&'a [u8]),
    Rows(&'a [Vec<u64>]),
    Reserved(usize),
}

/// What a property may look at while resolving its rule.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext {
    pub child_count: usize,
    /// Children were added or removed since the atom was read.
    pub children_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    origin: Origin,
}

impl Property {
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            origin: Origin::Unset,
        }
    }

    pub fn integer(name: &str, width: IntWidth) -> Self {
        Self::new(
            name,
            PropertyKind::Integer {
                width,
                value: 0,
                rule: None,
            },
        )
    }

    pub fn u8(name: &str) -> Self {
        Self::integer(name, IntWidth::U8)
    }
    pub fn u16(name: &str) -> Self {
        Self::integer(name, IntWidth::U16)
    }
    pub fn u24(name: &str) -> Self {
        Self::integer(name, IntWidth::U24)
    }
    pub fn u32(name: &str) -> Self {
        Self::integer(name, IntWidth::U32)
    }
    pub fn u64(name: &str) -> Self {
        Self::integer(name, IntWidth::U64)
    }

    pub fn reserved(name: &str, len: usize) -> Self {
        Self::new(name, PropertyKind::Reserved { len })
    }

    pub fn blob(name: &str, style: BlobStyle) -> Self {
        let value = match style {
            BlobStyle::Fixed(n) => vec![0; n],
            _ => Vec::new(),
        };
        Self::new(name, PropertyKind::Blob { style, value })
    }

    pub fn table(name: &str, count: TableCount, columns: Vec<Column>) -> Self {
        Self::new(
            name,
            PropertyKind::Table {
                count,
                columns,
                rows: Vec::new(),
            },
        )
    }

    /// Attaches a generation-time default. Only meaningful for integers.
    pub fn with_default(self, value: u64) -> Self {
        self.with_rule(ValueRule::Default(value))
    }

    /// Makes this integer track the owning atom's child count.
    pub fn child_count(self) -> Self {
        self.with_rule(ValueRule::ChildCount)
    }

    fn with_rule(mut self, r: ValueRule) -> Self {
        if let PropertyKind::Integer { rule, .. } = &mut self.kind {
            *rule = Some(r);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self.kind, PropertyKind::Reserved { .. })
    }

    pub fn value(&self) -> PropertyValue<'_> {
        match &self.kind {
            PropertyKind::Integer { value, .. } => PropertyValue::Integer(*value),
            PropertyKind::Reserved { len } => PropertyValue::Reserved(*len),
            PropertyKind::Blob { value, .. } => PropertyValue::Bytes(value),
            PropertyKind::Table { rows, .. } => PropertyValue::Rows(rows),
        }
    }

    /// Current wire length in bytes.
    pub fn size(&self) -> u64 {
        match &self.kind {
            PropertyKind::Integer { width, .. } => width.bytes(),
            PropertyKind::Reserved { len } => *len as u64,
            PropertyKind::Blob { style, value } => match style {
                BlobStyle::Fixed(n) => *n as u64,
                BlobStyle::Prefixed(w) => w.bytes() + value.len() as u64,
                BlobStyle::NullTerminated => value.len() as u64 + 1,
                BlobStyle::ToEnd => value.len() as u64,
            },
            PropertyKind::Table {
                count,
                columns,
                rows,
            } => {
                let prefix = match count {
                    TableCount::Prefixed(w) => w.bytes(),
                    TableCount::ToEnd => 0,
                };
                prefix + row_len(columns) * rows.len() as u64
            }
        }
    }

    // ---------- typed access ----------

    pub fn integer_value(&self) -> Result<u64> {
        match &self.kind {
            PropertyKind::Integer { value, .. } => Ok(*value),
            other => Err(self.mismatch("integer", other)),
        }
    }

    pub fn set_integer(&mut self, v: u64) -> Result<()> {
        let name = &self.name;
        match &mut self.kind {
            PropertyKind::Integer { width, value, .. } => {
                if v > width.max() {
                    return Err(Error::ValueOutOfRange {
                        name: name.clone(),
                        value: v,
                        bits: width.bits(),
                    });
                }
                *value = v;
                self.origin = Origin::Set;
                Ok(())
            }
            _ => Err(self.mismatch("integer", &self.kind)),
        }
    }

    pub fn bytes_value(&self) -> Result<&[u8]> {
        match &self.kind {
            PropertyKind::Blob { value, .. } => Ok(value),
            other => Err(self.mismatch("blob", other)),
        }
    }

    pub fn set_bytes(&mut self, v: &[u8]) -> Result<()> {
        let PropertyKind::Blob { style, value } = &mut self.kind else {
            return Err(self.mismatch("blob", &self.kind));
        };
        match *style {
            BlobStyle::Fixed(n) if v.len() != n => {
                return Err(Error::LengthMismatch {
                    name: self.name.clone(),
                    expected: n,
                    actual: v.len(),
                });
            }
            BlobStyle::Prefixed(w) if v.len() as u64 > w.max() => {
                return Err(Error::ValueOutOfRange {
                    name: self.name.clone(),
                    value: v.len() as u64,
                    bits: w.bits(),
                });
            }
            BlobStyle::NullTerminated if v.contains(&0) => {
                return Err(Error::InvalidValue {
                    name: self.name.clone(),
                    reason: "NUL-terminated value contains a NUL byte".into(),
                });
            }
            _ => {}
        }
        *value = v.to_vec();
        self.origin = Origin::Set;
        Ok(())
    }

    pub fn rows_value(&self) -> Result<&[Vec<u64>]> {
        match &self.kind {
            PropertyKind::Table { rows, .. } => Ok(rows),
            other => Err(self.mismatch("table", other)),
        }
    }

    pub fn set_rows(&mut self, new_rows: Vec<Vec<u64>>) -> Result<()> {
        let PropertyKind::Table {
            count,
            columns,
            rows,
        } = &mut self.kind
        else {
            return Err(self.mismatch("table", &self.kind));
        };
        if let TableCount::Prefixed(w) = count {
            if new_rows.len() as u64 > w.max() {
                return Err(Error::ValueOutOfRange {
                    name: self.name.clone(),
                    value: new_rows.len() as u64,
                    bits: w.bits(),
                });
            }
        }
        for row in &new_rows {
            if row.len() != columns.len() {
                return Err(Error::LengthMismatch {
                    name: self.name.clone(),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (col, v) in columns.iter().zip(row) {
                if *v > col.width.max() {
                    return Err(Error::ValueOutOfRange {
                        name: format!("{}.{}", self.name, col.name),
                        value: *v,
                        bits: col.width.bits(),
                    });
                }
            }
        }
        *rows = new_rows;
        self.origin = Origin::Set;
        Ok(())
    }

    fn mismatch(&self, expected: &'static str, actual: &PropertyKind) -> Error {
        Error::KindMismatch {
            name: self.name.clone(),
            expected,
            actual: actual.name(),
        }
    }

    // ---------- codec ----------

    /// Decodes this property from `cur`, consuming at most `limit` bytes.
    ///
    /// The value is committed only once the whole field has been decoded.
    pub fn read(&mut self, cur: &mut Cursor<&[u8]>, limit: u64) -> Result<()> {
        let avail = limit.min(remaining(cur));
        let name = self.name.as_str();
        let need = |needed: u64, what: &str| -> Result<()> {
            if needed > avail {
                Err(FormatError::Truncated {
                    what: what.to_string(),
                    needed,
                    available: avail,
                }
                .into())
            } else {
                Ok(())
            }
        };

        match &mut self.kind {
            PropertyKind::Integer { width, value, .. } => {
                need(width.bytes(), name)?;
                *value = width.read(cur)?;
                trace!(property = name, value = *value, "read integer");
            }
            PropertyKind::Reserved { len } => {
                need(*len as u64, name)?;
                let mut buf = vec![0u8; *len];
                cur.read_exact(&mut buf)?;
                if buf.iter().any(|&b| b != 0) {
                    warn!(property = name, "non-zero reserved bytes will be written as zero");
                }
            }
            PropertyKind::Blob { style, value } => {
                let bytes = match *style {
                    BlobStyle::Fixed(n) => {
                        need(n as u64, name)?;
                        take(cur, n)?
                    }
                    BlobStyle::Prefixed(w) => {
                        need(w.bytes(), name)?;
                        let start = cur.position();
                        let len = w.read(cur)?;
                        if let Err(e) = need(w.bytes().saturating_add(len), name) {
                            cur.set_position(start);
                            return Err(e);
                        }
                        take(cur, len as usize)?
                    }
                    BlobStyle::NullTerminated => {
                        let start = cur.position() as usize;
                        let window = &cur.get_ref()[start..start + avail as usize];
                        let Some(nul) = window.iter().position(|&b| b == 0) else {
                            return Err(FormatError::Truncated {
                                what: format!("{name} (no NUL terminator)"),
                                needed: avail + 1,
                                available: avail,
                            }
                            .into());
                        };
                        let v = window[..nul].to_vec();
                        cur.set_position((start + nul + 1) as u64);
                        v
                    }
                    BlobStyle::ToEnd => take(cur, avail as usize)?,
                };
                trace!(property = name, len = bytes.len(), "read blob");
                *value = bytes;
            }
            PropertyKind::Table {
                count,
                columns,
                rows,
            } => {
                let rlen = row_len(columns);
                let start = cur.position();
                let n = match *count {
                    TableCount::Prefixed(w) => {
                        need(w.bytes(), name)?;
                        let n = w.read(cur)?;
                        let body = n.checked_mul(rlen).and_then(|b| b.checked_add(w.bytes()));
                        match body {
                            Some(total) if total <= avail => n,
                            _ => {
                                cur.set_position(start);
                                return Err(FormatError::Truncated {
                                    what: format!("{name} ({n} rows)"),
                                    needed: body.unwrap_or(u64::MAX),
                                    available: avail,
                                }
                                .into());
                            }
                        }
                    }
                    TableCount::ToEnd if rlen == 0 => 0,
                    TableCount::ToEnd => {
                        if avail % rlen != 0 {
                            return Err(FormatError::Truncated {
                                what: format!("{name} (partial row)"),
                                needed: (avail / rlen + 1) * rlen,
                                available: avail,
                            }
                            .into());
                        }
                        avail / rlen
                    }
                };
                let mut out = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let mut row = Vec::with_capacity(columns.len());
                    for col in columns.iter() {
                        row.push(col.width.read(cur)?);
                    }
                    out.push(row);
                }
                trace!(property = name, rows = out.len(), "read table");
                *rows = out;
            }
        }
        self.origin = Origin::Read;
        Ok(())
    }

    /// Emits exactly the bytes [`Property::read`] would consume.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        match &self.kind {
            PropertyKind::Integer { width, value, .. } => width.write(w, *value)?,
            PropertyKind::Reserved { len } => w.write_all(&vec![0u8; *len])?,
            PropertyKind::Blob { style, value } => match *style {
                BlobStyle::Fixed(n) => {
                    let mut buf = value.clone();
                    buf.resize(n, 0);
                    w.write_all(&buf)?;
                }
                BlobStyle::Prefixed(iw) => {
                    iw.write(w, value.len() as u64)?;
                    w.write_all(value)?;
                }
                BlobStyle::NullTerminated => {
                    w.write_all(value)?;
                    w.write_u8(0)?;
                }
                BlobStyle::ToEnd => w.write_all(value)?,
            },
            PropertyKind::Table {
                count,
                columns,
                rows,
            } => {
                if let TableCount::Prefixed(iw) = count {
                    iw.write(w, rows.len() as u64)?;
                }
                for row in rows {
                    for (col, v) in columns.iter().zip(row) {
                        col.width.write(w, *v)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies this property's generation rule, if any.
    ///
    /// A child count that was read stays as read until the child list changes.
    pub fn resolve_default(&mut self, ctx: &ResolveContext) -> Result<()> {
        let PropertyKind::Integer {
            width,
            value,
            rule: Some(rule),
        } = &mut self.kind
        else {
            return Ok(());
        };
        match *rule {
            ValueRule::Default(v) => {
                if matches!(self.origin, Origin::Unset | Origin::Defaulted) {
                    *value = v;
                    self.origin = Origin::Defaulted;
                }
            }
            ValueRule::ChildCount => {
                if self.origin == Origin::Read && !ctx.children_changed {
                    return Ok(());
                }
                let count = ctx.child_count as u64;
                if count > width.max() {
                    return Err(Error::ValueOutOfRange {
                        name: self.name.clone(),
                        value: count,
                        bits: width.bits(),
                    });
                }
                *value = count;
                self.origin = Origin::Defaulted;
            }
        }
        Ok(())
    }

    /// Short human-readable rendering of the value.
    pub fn display_value(&self) -> String {
        match self.value() {
            PropertyValue::Integer(v) => v.to_string(),
            PropertyValue::Reserved(n) => format!("<{n} reserved bytes>"),
            PropertyValue::Bytes(b) => display_bytes(b),
            PropertyValue::Rows(rows) => format!("[{} rows]", rows.len()),
        }
    }
}

fn row_len(columns: &[Column]) -> u64 {
    columns.iter().map(|c| c.width.bytes()).sum()
}

fn remaining(cur: &Cursor<&[u8]>) -> u64 {
    (cur.get_ref().len() as u64).saturating_sub(cur.position())
}

fn take(cur: &mut Cursor<&[u8]>, n: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    cur.read_exact(&mut buf)?;
    Ok(buf)
}

fn display_bytes(b: &[u8]) -> String {
    if !b.is_empty() && b.iter().all(|&c| (32..=126).contains(&c)) {
        return format!("{:?}", String::from_utf8_lossy(b));
    }
    if b.len() > 16 {
        format!("{}... ({} bytes)", hex::encode(&b[..16]), b.len())
    } else {
        format!("0x{}", hex::encode(b))
    }
}
