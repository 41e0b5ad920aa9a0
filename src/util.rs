pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    // Simple hexdump
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk.iter().map(|b| {
            let c = *b;
            if (32..=126).contains(&c) { c as char } else { '.' }
        }).collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

/// Parses a user-supplied integer: decimal, `0x` hex, or a 4-character code
/// in single quotes (`'avc1'`).
pub fn parse_int(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(h) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(h, 16).ok();
    }
    if let Some(cc) = s.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        let b = cc.as_bytes();
        return (b.len() == 4).then(|| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64);
    }
    s.parse().ok()
}
