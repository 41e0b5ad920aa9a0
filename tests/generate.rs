mod common;

use common::{c608, stsd, stts};
use mp4atom::{Atom, AtomState, FourCC, default_registry, parse_tree};

fn check_sizes(root: &Atom) {
    root.walk(&mut |a: &Atom, _: usize| {
        let props: u64 = a.properties().iter().map(|p| p.size()).sum();
        let kids: u64 = a.children().iter().map(Atom::size).sum();
        assert_eq!(a.size(), a.header_size() + props + kids, "size of '{}'", a.typ());

        let mut copy = a.clone();
        let bytes = copy.to_bytes().unwrap();
        assert_eq!(bytes.len() as u64, a.size());
        assert_eq!(u32::from_be_bytes(bytes[..4].try_into().unwrap()) as u64, a.size());
    });
}

#[test]
fn fresh_c608_encodes_defaults() {
    let mut a = default_registry().create(FourCC(*b"c608"));
    a.generate().unwrap();
    assert_eq!(a.integer("dataReferenceIndex").unwrap(), 1);
    assert_eq!(
        a.to_bytes().unwrap(),
        [0, 0, 0, 0x10, b'c', b'6', b'0', b'8', 0, 0, 0, 0, 0, 0, 0, 1]
    );
}

#[test]
fn defaults_do_not_override_read_values() {
    let mut a = parse_tree(&c608(0)).unwrap();
    a.generate().unwrap();
    assert_eq!(a.integer("dataReferenceIndex").unwrap(), 0);
}

#[test]
fn explicit_values_survive_generation() {
    let mut a = default_registry().create(FourCC(*b"avc1"));
    a.set_integer("depth", 0x20).unwrap();
    a.generate().unwrap();
    assert_eq!(a.integer("depth").unwrap(), 0x20);
    assert_eq!(a.integer("frameCount").unwrap(), 1);
    assert_eq!(a.integer("colorTableId").unwrap(), 0xFFFF);
    assert_eq!(a.bytes("compressorName").unwrap(), &[0u8; 32]);
    assert_eq!(a.size(), 8 + 78);
}

#[test]
fn generation_is_idempotent() {
    let reg = default_registry();
    let mut stbl = reg.instantiate(FourCC(*b"stbl"));
    stbl.child_mut(b"stts")
        .unwrap()
        .set_rows("entries", vec![vec![30, 1001], vec![1, 500]])
        .unwrap();
    stbl.child_mut(b"stsd")
        .unwrap()
        .add_child(reg.create(FourCC(*b"c608")));

    stbl.generate().unwrap();
    assert_eq!(stbl.state(), AtomState::Generated);
    let first = stbl.to_bytes().unwrap();
    stbl.generate().unwrap();
    let second = stbl.to_bytes().unwrap();
    assert_eq!(first, second);
    check_sizes(&stbl);
}

#[test]
fn entry_count_follows_children() {
    let reg = default_registry();
    let mut a = parse_tree(&stsd(&[c608(1)])).unwrap();
    assert_eq!(a.integer("entryCount").unwrap(), 1);

    a.add_child(reg.create(FourCC(*b"c608")));
    a.add_child(reg.create(FourCC(*b"c608")));
    a.generate().unwrap();
    assert_eq!(a.integer("entryCount").unwrap(), 3);

    a.remove_child(FourCC(*b"c608"), 0);
    let bytes = a.to_bytes().unwrap();
    assert_eq!(&bytes[12..16], &2u32.to_be_bytes());
    assert_eq!(bytes.len(), 16 + 2 * 16);
}

#[test]
fn instantiate_builds_required_children() {
    let reg = default_registry();
    let mut trak = reg.instantiate(FourCC(*b"trak"));

    // tkhd and mdhd have no schema and are left out
    assert!(trak.child(b"tkhd").is_none());
    assert!(trak.find("mdia.hdlr").is_ok());
    assert!(trak.find("mdia.minf.dinf.dref").is_ok());
    for t in ["stsd", "stts", "stsc"] {
        assert!(trak.find(&format!("mdia.minf.stbl.{t}")).is_ok(), "missing {t}");
    }

    trak.find_mut("mdia.minf.dinf.dref")
        .unwrap()
        .add_child(reg.create(FourCC(*b"url ")));
    let bytes = trak.to_bytes().unwrap();

    let dref = trak.find("mdia.minf.dinf.dref").unwrap();
    assert_eq!(dref.integer("entryCount").unwrap(), 1);
    assert_eq!(dref.child(b"url ").unwrap().integer("flags").unwrap(), 1);
    assert_eq!(dref.size(), 28);
    check_sizes(&trak);

    let mut reparsed = parse_tree(&bytes).unwrap();
    assert_eq!(reparsed.to_bytes().unwrap(), bytes);
}

#[test]
fn parsed_tree_sizes_are_consistent() {
    let data = common::small_file();
    for a in mp4atom::parse_atoms(&data).unwrap() {
        check_sizes(&a);
    }
    let stbl = parse_tree(&common::bx(b"stbl", &[stsd(&[c608(1)]), stts(&[(1, 1)])].concat())).unwrap();
    check_sizes(&stbl);
}
