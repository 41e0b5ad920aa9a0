//! Built-in box schemas.
//!
//! Only boxes whose layout does not depend on a field value are described
//! here. Version-dependent boxes (`mvhd`, `tkhd`, `mdhd`, `tfhd`, `tfdt`,
//! `elst`, ...) stay opaque and round-trip byte for byte.

use crate::atom::Atom;
use crate::boxes::FourCC;
use crate::property::{BlobStyle, Column, IntWidth, Property, TableCount};
use crate::registry::Registry;

type Ctor = fn(FourCC) -> Atom;

const TABLE: &[(&[u8; 4], &str, Ctor)] = &[
    // file level
    (b"ftyp", "File Type Box", file_type),
    (b"styp", "Segment Type Box", file_type),
    (b"free", "Free Space Box", Atom::raw),
    (b"skip", "Free Space Box", Atom::raw),
    (b"wide", "Wide Box", Atom::raw),
    (b"mdat", "Media Data Box", Atom::raw),
    // containers
    (b"moov", "Movie Box", moov),
    (b"trak", "Track Box", trak),
    (b"edts", "Edit Box", edts),
    (b"mdia", "Media Box", mdia),
    (b"minf", "Media Information Box", minf),
    (b"dinf", "Data Information Box", dinf),
    (b"stbl", "Sample Table Box", stbl),
    (b"udta", "User Data Box", Atom::new),
    (b"mvex", "Movie Extends Box", mvex),
    (b"moof", "Movie Fragment Box", moof),
    (b"traf", "Track Fragment Box", traf),
    (b"mfra", "Movie Fragment Random Access Box", mfra),
    // media headers
    (b"vmhd", "Video Media Header Box", vmhd),
    (b"smhd", "Sound Media Header Box", smhd),
    (b"nmhd", "Null Media Header Box", full_box),
    (b"hdlr", "Handler Reference Box", hdlr),
    // data references
    (b"dref", "Data Reference Box", dref),
    (b"url ", "Data Entry URL Box", url),
    (b"urn ", "Data Entry URN Box", urn),
    // sample tables
    (b"stsd", "Sample Description Box", stsd),
    (b"stts", "Decoding Time to Sample Box", stts),
    (b"ctts", "Composition Time to Sample Box", ctts),
    (b"stss", "Sync Sample Box", stss),
    (b"stsc", "Sample To Chunk Box", stsc),
    (b"stco", "Chunk Offset Box", stco),
    (b"co64", "64-bit Chunk Offset Box", co64),
    // fragments
    (b"mfhd", "Movie Fragment Header Box", mfhd),
    (b"trex", "Track Extends Box", trex),
    // sample entries
    (b"c608", "CEA-608 Closed Caption Sample Entry", c608),
    (b"avc1", "AVC Sample Entry", visual_sample_entry),
    (b"avc3", "AVC Sample Entry", visual_sample_entry),
    (b"hvc1", "HEVC Sample Entry", visual_sample_entry),
    (b"hev1", "HEVC Sample Entry", visual_sample_entry),
    (b"mp4v", "MPEG-4 Visual Sample Entry", visual_sample_entry),
];

/// Adds every built-in schema to `reg`.
pub fn register(reg: Registry) -> Registry {
    TABLE.iter().fold(reg, |reg, (code, name, ctor)| {
        reg.with_factory(FourCC(**code), name, Box::new(*ctor))
    })
}

// ---------- shared shapes ----------

fn full_box(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_property(Property::u8("version"))
        .with_property(Property::u24("flags"))
}

fn entry_table(typ: FourCC, columns: &[(&str, IntWidth)]) -> Atom {
    let cols = columns.iter().map(|(n, w)| Column::new(n, *w)).collect();
    full_box(typ).with_property(Property::table(
        "entries",
        TableCount::Prefixed(IntWidth::U32),
        cols,
    ))
}

// ---------- file level ----------

fn file_type(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_property(Property::u32("majorBrand"))
        .with_property(Property::u32("minorVersion"))
        .with_property(Property::table(
            "compatibleBrands",
            TableCount::ToEnd,
            vec![Column::new("brand", IntWidth::U32)],
        ))
}

// ---------- containers ----------

fn moov(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"mvhd", true, true)
        .with_child_slot(b"trak", false, false)
        .with_child_slot(b"mvex", false, true)
        .with_child_slot(b"udta", false, true)
}

fn trak(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"tkhd", true, true)
        .with_child_slot(b"edts", false, true)
        .with_child_slot(b"mdia", true, true)
        .with_child_slot(b"udta", false, true)
}

fn edts(typ: FourCC) -> Atom {
    Atom::new(typ).with_child_slot(b"elst", false, true)
}

fn mdia(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"mdhd", true, true)
        .with_child_slot(b"hdlr", true, true)
        .with_child_slot(b"minf", true, true)
}

fn minf(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"vmhd", false, true)
        .with_child_slot(b"smhd", false, true)
        .with_child_slot(b"nmhd", false, true)
        .with_child_slot(b"dinf", true, true)
        .with_child_slot(b"stbl", true, true)
}

fn dinf(typ: FourCC) -> Atom {
    Atom::new(typ).with_child_slot(b"dref", true, true)
}

fn stbl(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"stsd", true, true)
        .with_child_slot(b"stts", true, true)
        .with_child_slot(b"ctts", false, true)
        .with_child_slot(b"stss", false, true)
        .with_child_slot(b"stsc", true, true)
        .with_child_slot(b"stsz", false, true)
        .with_child_slot(b"stco", false, true)
        .with_child_slot(b"co64", false, true)
}

fn mvex(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"mehd", false, true)
        .with_child_slot(b"trex", true, false)
}

fn moof(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"mfhd", true, true)
        .with_child_slot(b"traf", false, false)
}

fn traf(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"tfhd", true, true)
        .with_child_slot(b"tfdt", false, true)
        .with_child_slot(b"trun", false, false)
}

fn mfra(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_child_slot(b"tfra", false, false)
        .with_child_slot(b"mfro", false, true)
}

// ---------- media headers ----------

fn vmhd(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_property(Property::u8("version"))
        .with_property(Property::u24("flags").with_default(1))
        .with_property(Property::u16("graphicsMode"))
        .with_property(Property::u16("opColorRed"))
        .with_property(Property::u16("opColorGreen"))
        .with_property(Property::u16("opColorBlue"))
}

fn smhd(typ: FourCC) -> Atom {
    full_box(typ)
        .with_property(Property::u16("balance"))
        .with_property(Property::reserved("reserved", 2))
}

// ISO calls preDefined and the three component fields reserved; QuickTime
// stores component type, manufacturer and flags there.
fn hdlr(typ: FourCC) -> Atom {
    full_box(typ)
        .with_property(Property::u32("preDefined"))
        .with_property(Property::u32("handlerType"))
        .with_property(Property::u32("componentManufacturer"))
        .with_property(Property::u32("componentFlags"))
        .with_property(Property::u32("componentFlagsMask"))
        .with_property(Property::blob("name", BlobStyle::ToEnd))
}

// ---------- data references ----------

fn dref(typ: FourCC) -> Atom {
    full_box(typ)
        .with_property(Property::u32("entryCount").child_count())
        .with_child_slot(b"url ", false, false)
        .with_child_slot(b"urn ", false, false)
}

fn url(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_property(Property::u8("version"))
        .with_property(Property::u24("flags").with_default(1))
        .with_property(Property::blob("location", BlobStyle::ToEnd))
}

fn urn(typ: FourCC) -> Atom {
    full_box(typ)
        .with_property(Property::blob("name", BlobStyle::NullTerminated))
        .with_property(Property::blob("location", BlobStyle::ToEnd))
}

// ---------- sample tables ----------

fn stsd(typ: FourCC) -> Atom {
    full_box(typ).with_property(Property::u32("entryCount").child_count())
}

fn stts(typ: FourCC) -> Atom {
    entry_table(typ, &[("sampleCount", IntWidth::U32), ("sampleDelta", IntWidth::U32)])
}

fn ctts(typ: FourCC) -> Atom {
    entry_table(typ, &[("sampleCount", IntWidth::U32), ("sampleOffset", IntWidth::U32)])
}

fn stss(typ: FourCC) -> Atom {
    entry_table(typ, &[("sampleNumber", IntWidth::U32)])
}

fn stsc(typ: FourCC) -> Atom {
    entry_table(
        typ,
        &[
            ("firstChunk", IntWidth::U32),
            ("samplesPerChunk", IntWidth::U32),
            ("sampleDescriptionIndex", IntWidth::U32),
        ],
    )
}

fn stco(typ: FourCC) -> Atom {
    entry_table(typ, &[("chunkOffset", IntWidth::U32)])
}

fn co64(typ: FourCC) -> Atom {
    entry_table(typ, &[("chunkOffset", IntWidth::U64)])
}

// ---------- fragments ----------

fn mfhd(typ: FourCC) -> Atom {
    full_box(typ).with_property(Property::u32("sequenceNumber"))
}

fn trex(typ: FourCC) -> Atom {
    full_box(typ)
        .with_property(Property::u32("trackId"))
        .with_property(Property::u32("defaultSampleDescriptionIndex").with_default(1))
        .with_property(Property::u32("defaultSampleDuration"))
        .with_property(Property::u32("defaultSampleSize"))
        .with_property(Property::u32("defaultSampleFlags"))
}

// ---------- sample entries ----------

fn c608(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_property(Property::reserved("reserved1", 4))
        .with_property(Property::reserved("reserved2", 2))
        .with_property(Property::u16("dataReferenceIndex").with_default(1))
}

// QuickTime stores version/vendor/quality in the ISO pre_defined area, so
// those are kept as values rather than zeroed reserved bytes.
fn visual_sample_entry(typ: FourCC) -> Atom {
    Atom::new(typ)
        .with_property(Property::reserved("reserved1", 6))
        .with_property(Property::u16("dataReferenceIndex").with_default(1))
        .with_property(Property::u16("version"))
        .with_property(Property::u16("revisionLevel"))
        .with_property(Property::u32("vendor"))
        .with_property(Property::u32("temporalQuality"))
        .with_property(Property::u32("spatialQuality"))
        .with_property(Property::u16("width"))
        .with_property(Property::u16("height"))
        .with_property(Property::u32("horizResolution").with_default(0x0048_0000))
        .with_property(Property::u32("vertResolution").with_default(0x0048_0000))
        .with_property(Property::u32("dataSize"))
        .with_property(Property::u16("frameCount").with_default(1))
        .with_property(Property::blob("compressorName", BlobStyle::Fixed(32)))
        .with_property(Property::u16("depth").with_default(0x18))
        .with_property(Property::u16("colorTableId").with_default(0xFFFF))
}
