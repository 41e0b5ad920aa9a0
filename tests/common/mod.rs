#![allow(dead_code)]

/// Wraps `payload` in a compact box header.
pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    out.extend_from_slice(typ);
    out.extend_from_slice(payload);
    out
}

/// Full box: version 0, flags 0, then `payload`.
pub fn full(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8, 0, 0, 0];
    body.extend_from_slice(payload);
    bx(typ, &body)
}

pub fn cat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

/// c608 sample entry with the given data reference index.
pub fn c608(dri: u16) -> Vec<u8> {
    let mut p = vec![0u8; 6];
    p.extend_from_slice(&dri.to_be_bytes());
    bx(b"c608", &p)
}

/// avc1 sample entry (640x480) with an opaque avcC child.
pub fn avc1() -> Vec<u8> {
    let mut p = vec![0u8; 6];
    p.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    p.extend_from_slice(&[0u8; 16]); // version, revision, vendor, qualities
    p.extend_from_slice(&640u16.to_be_bytes());
    p.extend_from_slice(&480u16.to_be_bytes());
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes()); // data size
    p.extend_from_slice(&1u16.to_be_bytes()); // frame count
    let mut name = [0u8; 32];
    name[0] = 4;
    name[1..5].copy_from_slice(b"test");
    p.extend_from_slice(&name);
    p.extend_from_slice(&0x0018u16.to_be_bytes());
    p.extend_from_slice(&0xFFFFu16.to_be_bytes());
    p.extend_from_slice(&bx(b"avcC", &[1, 0x64, 0, 0x1f, 0xff]));
    bx(b"avc1", &p)
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = (entries.len() as u32).to_be_bytes().to_vec();
    for e in entries {
        p.extend_from_slice(e);
    }
    full(b"stsd", &p)
}

pub fn stts(rows: &[(u32, u32)]) -> Vec<u8> {
    let mut p = (rows.len() as u32).to_be_bytes().to_vec();
    for (count, delta) in rows {
        p.extend_from_slice(&count.to_be_bytes());
        p.extend_from_slice(&delta.to_be_bytes());
    }
    full(b"stts", &p)
}

/// ftyp + moov(trak(mdia(minf(stbl(stsd, stts))))) + mdat
pub fn small_file() -> Vec<u8> {
    let mut ftyp = b"isom".to_vec();
    ftyp.extend_from_slice(&512u32.to_be_bytes());
    ftyp.extend_from_slice(b"isomiso2");

    let stbl = bx(b"stbl", &cat(&[stsd(&[c608(1)]), stts(&[(10, 1001)])]));
    let minf = bx(b"minf", &stbl);
    let mdia = bx(b"mdia", &minf);
    let trak = bx(b"trak", &mdia);
    let moov = bx(b"moov", &trak);

    cat(&[bx(b"ftyp", &ftyp), moov, bx(b"mdat", &[0xde, 0xad, 0xbe, 0xef])])
}
