//! Dotted atom paths: `moov.trak[1].mdia.minf.stbl.stsd`.
//!
//! Each segment is a type code with an optional zero-based index among
//! siblings of that type. Codes shorter than four characters are padded with
//! spaces, so `url` addresses `url `.

use crate::boxes::FourCC;
use crate::error::{Error, Result};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub typ: FourCC,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomPath {
    segments: Vec<Segment>,
}

impl AtomPath {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for AtomPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Ok(AtomPath::default());
        }
        let segments = path
            .split('.')
            .map(|seg| parse_segment(seg).ok_or_else(|| Error::InvalidPath(path.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(AtomPath { segments })
    }
}

fn parse_segment(seg: &str) -> Option<Segment> {
    let (name, index) = match seg.find('[') {
        Some(l) => {
            let rest = seg[l + 1..].strip_suffix(']')?;
            (&seg[..l], rest.parse::<usize>().ok()?)
        }
        None => (seg, 0),
    };
    if name.is_empty() || name.len() > 4 || !name.is_ascii() {
        return None;
    }
    let typ = FourCC::from_str(&format!("{name:<4}"))?;
    Some(Segment { typ, index })
}

/// Splits `a.b.propertyName` into the atom path `a.b` and `propertyName`.
pub fn split_property_path(path: &str) -> Result<(&str, &str)> {
    let (atoms, name) = match path.rfind('.') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    };
    if name.is_empty() {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok((atoms, name))
}
