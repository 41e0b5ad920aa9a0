mod common;

use common::{bx, c608, stts};
use mp4atom::{
    Atom, Error, FormatError, FourCC, ParseOptions, Property, default_registry, parse_atoms,
    parse_tree, parse_tree_with,
};
use std::io::Cursor;

#[test]
fn one_byte_short_is_truncated() {
    let data = c608(1);
    let err = parse_tree(&data[..data.len() - 1]).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::Truncated { needed: 16, available: 15, .. })
    ));
}

#[test]
fn failed_read_keeps_previous_values() {
    let reg = default_registry();
    let mut atom = reg.create(FourCC(*b"c608"));
    atom.set_integer("dataReferenceIndex", 7).unwrap();

    // header claims 14 bytes: reserved fields fit, the index does not
    let mut data = c608(9);
    data[3] = 14;
    data.truncate(14);

    let mut cur = Cursor::new(&data[..]);
    let err = atom.read(&mut cur, &reg, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err.as_format(), Some(FormatError::Truncated { .. })));
    assert_eq!(atom.integer("dataReferenceIndex").unwrap(), 7);
    assert_eq!(cur.position(), 0);
}

#[test]
fn read_rejects_wrong_type() {
    let reg = default_registry();
    let mut atom = reg.create(FourCC(*b"stts"));
    let data = c608(1);
    let err = atom
        .read(&mut Cursor::new(&data[..]), &reg, &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err.as_format(), Some(FormatError::TypeMismatch { .. })));
}

#[test]
fn leftover_payload_is_size_mismatch() {
    let mut payload = vec![0u8; 6];
    payload.extend_from_slice(&1u16.to_be_bytes());
    payload.push(0xff);
    let err = parse_tree(&bx(b"c608", &payload)).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::SizeMismatch { declared: 9, consumed: 8, .. })
    ));
}

#[test]
fn child_larger_than_parent_is_rejected() {
    // moov declares 16 bytes, its child claims 12
    let mut data = bx(b"moov", &[0, 0, 0, 12, b'f', b'r', b'e', b'e']);
    data.extend_from_slice(&[0, 0, 0, 0]);
    let err = parse_atoms(&data).unwrap_err();
    assert!(err.as_format().is_some());
}

#[test]
fn table_count_beyond_payload_is_truncated() {
    let mut data = stts(&[(1, 1)]);
    data[12..16].copy_from_slice(&1_000_000u32.to_be_bytes());
    let err = parse_tree(&data).unwrap_err();
    assert!(matches!(err.as_format(), Some(FormatError::Truncated { .. })));
}

#[test]
fn trailing_bytes_after_tree() {
    let mut data = c608(1);
    data.extend_from_slice(&[0, 0]);
    let err = parse_tree(&data).unwrap_err();
    assert!(matches!(err.as_format(), Some(FormatError::TrailingData { remaining: 2, .. })));
}

fn nested_udta(levels: usize) -> Vec<u8> {
    (0..levels).fold(Vec::new(), |inner, _| bx(b"udta", &inner))
}

#[test]
fn nesting_beyond_limit_fails() {
    let data = nested_udta(100);
    let err = parse_tree(&data).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::DepthLimit { depth: 65, max: 64 })
    ));

    let opts = ParseOptions::default().with_max_depth(128);
    let atom = parse_tree_with(&data, &default_registry(), &opts).unwrap();
    let mut deepest = 0;
    atom.walk(&mut |_: &Atom, d: usize| deepest = deepest.max(d));
    assert_eq!(deepest, 99);
}

#[test]
fn strict_children_reports_missing_slots() {
    let data = bx(b"stbl", &[]);
    assert!(parse_tree(&data).is_ok());

    let opts = ParseOptions {
        strict_children: true,
        ..Default::default()
    };
    let err = parse_tree_with(&data, &default_registry(), &opts).unwrap_err();
    assert!(matches!(err.as_format(), Some(FormatError::MissingChild { .. })));
}

#[test]
fn strict_children_reports_duplicates() {
    let stsd = common::stsd(&[]);
    let data = bx(b"stbl", &[stsd.clone(), stsd, stts(&[]), bx(b"stsc", &[0; 8])].concat());
    let opts = ParseOptions {
        strict_children: true,
        ..Default::default()
    };
    let err = parse_tree_with(&data, &default_registry(), &opts).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::DuplicateChild { count: 2, .. })
    ));
}

#[test]
fn setters_validate_values() {
    let reg = default_registry();
    let mut a = reg.create(FourCC(*b"c608"));
    assert!(matches!(
        a.set_integer("dataReferenceIndex", 0x1_0000),
        Err(Error::ValueOutOfRange { bits: 16, .. })
    ));
    assert!(matches!(
        a.set_bytes("dataReferenceIndex", b"x"),
        Err(Error::KindMismatch { .. })
    ));

    let mut avc = reg.create(FourCC(*b"avc1"));
    assert!(matches!(
        avc.set_bytes("compressorName", b"short"),
        Err(Error::LengthMismatch { expected: 32, actual: 5, .. })
    ));

    let mut t = reg.create(FourCC(*b"stts"));
    assert!(t.set_rows("entries", vec![vec![1]]).is_err());
    assert!(t.set_rows("entries", vec![vec![1, 1 << 32]]).is_err());
}

#[test]
fn child_count_overflow_fails_generation() {
    let mut a = Atom::new(FourCC(*b"list")).with_property(Property::u8("count").child_count());
    for _ in 0..256 {
        a.add_child(Atom::raw(FourCC(*b"free")));
    }
    assert!(matches!(
        a.generate(),
        Err(Error::ValueOutOfRange { value: 256, bits: 8, .. })
    ));
    assert!(!a.is_generated());
    assert!(a.to_bytes().is_err());

    a.remove_child(FourCC(*b"free"), 0);
    let bytes = a.to_bytes().unwrap();
    assert_eq!(bytes[8], 255);
}
