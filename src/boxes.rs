use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(b: &[u8; 4]) -> Self {
        FourCC(*b)
    }
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl From<u32> for FourCC { fn from(v: u32) -> Self { FourCC(v.to_be_bytes()) } }
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

/// How a box header encoded its size on the wire.
///
/// Kept on the atom so that writing a parsed tree reproduces the same header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeForm {
    /// 32-bit size field.
    #[default]
    Compact,
    /// `size == 1` followed by a 64-bit size.
    Large,
    /// `size == 0`: the box runs to the end of its enclosing budget.
    ToEnd,
}

impl SizeForm {
    pub fn header_len(self) -> u64 {
        match self {
            SizeForm::Large => 16,
            SizeForm::Compact | SizeForm::ToEnd => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,          // total size including header (resolved for ToEnd)
    pub typ: FourCC,
    pub header_size: u64,   // 8 or 16
    pub start: u64,         // offset of header start within the parsed buffer
    pub form: SizeForm,
}

impl BoxHeader {
    pub fn payload_len(&self) -> u64 {
        self.size - self.header_size
    }
}
