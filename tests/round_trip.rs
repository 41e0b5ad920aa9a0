mod common;

use common::{avc1, bx, c608, cat, full, small_file, stsd, stts};
use mp4atom::{FourCC, SizeForm, parse_atoms, parse_tree, serialize_atoms, serialize_tree};

#[test]
fn unknown_box_round_trips_with_header() {
    let data = bx(&[0xA9, b'n', b'a', b'm'], b"\x00\x01 arbitrary payload \xff");
    let mut atom = parse_tree(&data).expect("parse failed");

    assert!(atom.is_opaque());
    assert_eq!(atom.typ(), FourCC([0xA9, b'n', b'a', b'm']));
    assert_eq!(atom.payload().unwrap(), b"\x00\x01 arbitrary payload \xff");
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);
}

#[test]
fn empty_unknown_box_round_trips() {
    let data = bx(b"zzzz", &[]);
    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.size(), 8);
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);
}

#[test]
fn nested_known_and_unknown_boxes_round_trip() {
    let stbl = bx(b"stbl", &cat(&[stsd(&[c608(1), avc1()]), stts(&[(100, 1024), (1, 512)])]));
    let udta = bx(b"udta", &bx(b"abcd", b"opaque"));
    let data = bx(b"moov", &cat(&[bx(b"trak", &bx(b"mdia", &bx(b"minf", &stbl))), udta]));

    let mut atom = parse_tree(&data).unwrap();
    let stsd_atom = atom.find("trak.mdia.minf.stbl.stsd").unwrap();
    assert_eq!(stsd_atom.integer("entryCount").unwrap(), 2);
    assert_eq!(stsd_atom.children().len(), 2);

    let avc = stsd_atom.child(b"avc1").unwrap();
    assert_eq!(avc.integer("width").unwrap(), 640);
    assert_eq!(avc.integer("height").unwrap(), 480);
    assert!(avc.child(b"avcC").unwrap().is_opaque());

    assert!(atom.find("udta.abcd").unwrap().is_opaque());
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);
}

#[test]
fn whole_file_round_trips() {
    let data = small_file();
    let mut atoms = parse_atoms(&data).unwrap();
    assert_eq!(atoms.len(), 3);
    assert_eq!(atoms[0].typ(), FourCC(*b"ftyp"));
    assert_eq!(
        atoms[0].rows("compatibleBrands").unwrap(),
        &[vec![u32::from_be_bytes(*b"isom") as u64], vec![u32::from_be_bytes(*b"iso2") as u64]]
    );
    assert_eq!(atoms[2].payload().unwrap(), &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(serialize_atoms(&mut atoms).unwrap(), data);
}

#[test]
fn large_size_header_is_preserved() {
    let mut data = vec![0u8, 0, 0, 1];
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&19u64.to_be_bytes());
    data.extend_from_slice(&[1, 2, 3]);

    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.form(), SizeForm::Large);
    assert_eq!(atom.size(), 19);
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);
}

#[test]
fn to_end_size_is_preserved() {
    let mut data = bx(b"free", &[]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[9, 8, 7, 6, 5]);

    let mut atoms = parse_atoms(&data).unwrap();
    assert_eq!(atoms[1].form(), SizeForm::ToEnd);
    assert_eq!(atoms[1].payload().unwrap(), &[9, 8, 7, 6, 5]);
    assert_eq!(serialize_atoms(&mut atoms).unwrap(), data);
}

#[test]
fn reserved_bytes_are_normalized_to_zero() {
    let mut payload = vec![1u8, 2, 3, 4, 5, 6];
    payload.extend_from_slice(&3u16.to_be_bytes());
    let data = bx(b"c608", &payload);

    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.integer("dataReferenceIndex").unwrap(), 3);
    assert_eq!(serialize_tree(&mut atom).unwrap(), c608(3));
}

#[test]
fn mutation_changes_only_the_target_field() {
    let data = full(b"mfhd", &7u32.to_be_bytes());
    let mut atom = parse_tree(&data).unwrap();
    atom.set_integer("sequenceNumber", 8).unwrap();

    let out = serialize_tree(&mut atom).unwrap();
    assert_eq!(out.len(), data.len());
    assert_eq!(&out[..12], &data[..12]);
    assert_eq!(&out[12..], &8u32.to_be_bytes());
}

#[test]
fn quicktime_handler_fields_round_trip() {
    let mut payload = b"mhlrvideappl".to_vec();
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(&0x0001_001fu32.to_be_bytes());
    payload.extend_from_slice(b"\x0cApple Handler");
    let data = full(b"hdlr", &payload);

    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.integer("handlerType").unwrap(), u32::from_be_bytes(*b"vide") as u64);
    assert_eq!(
        atom.integer("componentManufacturer").unwrap(),
        u32::from_be_bytes(*b"appl") as u64
    );
    assert_eq!(atom.integer("componentFlagsMask").unwrap(), 0x0001_001f);
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);
}

#[test]
fn co64_offsets_beyond_32_bits_round_trip() {
    let mut payload = 2u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&0x30u64.to_be_bytes());
    payload.extend_from_slice(&0x1_2345_6789u64.to_be_bytes());
    let data = full(b"co64", &payload);

    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.rows("entries").unwrap(), &[vec![0x30u64], vec![0x1_2345_6789u64]]);
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);

    atom.set_rows("entries", vec![vec![u64::MAX]]).unwrap();
    let out = serialize_tree(&mut atom).unwrap();
    assert_eq!(&out[12..16], &1u32.to_be_bytes());
    assert_eq!(&out[16..], &[0xff; 8]);
}

#[test]
fn read_entry_count_is_written_back_unchanged() {
    // count says 5, only one entry present
    let mut payload = 5u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&c608(1));
    let data = full(b"stsd", &payload);

    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.integer("entryCount").unwrap(), 5);
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);

    atom.child_mut(b"c608").unwrap().set_integer("dataReferenceIndex", 2).unwrap();
    let out = serialize_tree(&mut atom).unwrap();
    assert_eq!(&out[12..16], &5u32.to_be_bytes());
}

#[test]
fn to_end_box_gets_a_size_once_followed() {
    let mut data = bx(b"free", &[]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[9, 8, 7]);

    let mut atoms = parse_atoms(&data).unwrap();
    atoms.push(parse_tree(&bx(b"skip", &[1])).unwrap());
    let out = serialize_atoms(&mut atoms).unwrap();
    assert_eq!(&out[8..16], &bx(b"mdat", &[9, 8, 7])[..8]);

    let reparsed = parse_atoms(&out).unwrap();
    assert_eq!(reparsed.len(), 3);
    assert_eq!(reparsed[1].form(), SizeForm::Compact);
    assert_eq!(reparsed[1].payload().unwrap(), &[9, 8, 7]);
    assert_eq!(reparsed[2].typ(), FourCC(*b"skip"));
}

#[test]
fn nested_to_end_child_gets_a_size_once_followed() {
    let mut inner = vec![0u8, 0, 0, 0];
    inner.extend_from_slice(b"meta");
    inner.extend_from_slice(&[1, 2]);
    let data = bx(b"udta", &inner);

    let mut atom = parse_tree(&data).unwrap();
    assert_eq!(atom.children()[0].form(), SizeForm::ToEnd);
    assert_eq!(serialize_tree(&mut atom).unwrap(), data);

    atom.add_child(parse_tree(&bx(b"name", b"x")).unwrap());
    let out = serialize_tree(&mut atom).unwrap();
    let reparsed = parse_tree(&out).unwrap();
    assert_eq!(reparsed.children().len(), 2);
    assert_eq!(reparsed.children()[0].payload().unwrap(), &[1, 2]);
    assert_eq!(reparsed.children()[1].typ(), FourCC(*b"name"));
}
