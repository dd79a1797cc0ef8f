//! The first byte of every encoded value identifies its kind and, for the fixed encodings, folds
//! the payload into the tag itself. The full table:
//!
//! | byte          | meaning                                 |
//! |---------------|-----------------------------------------|
//! | `0x00..=0x7f` | positive fixnum (the byte is the value) |
//! | `0x80..=0x8f` | map, pair count in the low nibble       |
//! | `0x90..=0x9f` | array, count in the low nibble          |
//! | `0xa0..=0xbf` | raw, length in the low five bits        |
//! | `0xc0`        | nil                                     |
//! | `0xc2`/`0xc3` | false / true                            |
//! | `0xca`/`0xcb` | f32 / f64, 4/8 payload bytes            |
//! | `0xcc..=0xcf` | uint 8/16/32/64                         |
//! | `0xd0..=0xd3` | int 8/16/32/64                          |
//! | `0xda`/`0xdb` | raw with 16/32 bit length               |
//! | `0xdc`/`0xdd` | array with 16/32 bit count              |
//! | `0xde`/`0xdf` | map with 16/32 bit count                |
//! | `0xe0..=0xff` | negative fixnum, -32..=-1               |
//!
//! All multi-byte lengths and payloads are big-endian. The remaining bytes (`0xc1`,
//! `0xc4..=0xc9`, `0xd4..=0xd9`) are not part of the format and decode to [`Marker::Reserved`].

/// Classification of a lead byte. [`Marker::from_u8`] is total: every possible byte maps to a
/// marker, undefined ones to `Reserved`, so that the rejection of malformed input happens in
/// exactly one place in the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `0x00..=0x7f`, the value is the byte itself
    FixPos(u8),
    /// `0xe0..=0xff` interpreted as two's complement, values -32..=-1
    FixNeg(i8),
    Nil,
    False,
    True,
    F32,
    F64,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    /// `0xa0..=0xbf`, length 0..=31 in the low five bits
    FixRaw(u8),
    Raw16,
    Raw32,
    /// `0x90..=0x9f`, count 0..=15 in the low nibble
    FixArray(u8),
    Array16,
    Array32,
    /// `0x80..=0x8f`, pair count 0..=15 in the low nibble
    FixMap(u8),
    Map16,
    Map32,
    /// A byte outside the format table
    Reserved(u8),
}

impl Marker {

    pub fn from_u8(byte: u8) -> Marker {
        match byte {
            0x00..=0x7f => Marker::FixPos(byte),
            0x80..=0x8f => Marker::FixMap(byte & 0x0f),
            0x90..=0x9f => Marker::FixArray(byte & 0x0f),
            0xa0..=0xbf => Marker::FixRaw(byte & 0x1f),
            0xc0 => Marker::Nil,
            0xc2 => Marker::False,
            0xc3 => Marker::True,
            0xca => Marker::F32,
            0xcb => Marker::F64,
            0xcc => Marker::U8,
            0xcd => Marker::U16,
            0xce => Marker::U32,
            0xcf => Marker::U64,
            0xd0 => Marker::I8,
            0xd1 => Marker::I16,
            0xd2 => Marker::I32,
            0xd3 => Marker::I64,
            0xda => Marker::Raw16,
            0xdb => Marker::Raw32,
            0xdc => Marker::Array16,
            0xdd => Marker::Array32,
            0xde => Marker::Map16,
            0xdf => Marker::Map32,
            0xe0..=0xff => Marker::FixNeg(byte as i8),
            _ => Marker::Reserved(byte),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Marker::FixPos(v) => v,
            Marker::FixMap(v) => 0x80 | v,
            Marker::FixArray(v) => 0x90 | v,
            Marker::FixRaw(v) => 0xa0 | v,
            Marker::Nil => 0xc0,
            Marker::False => 0xc2,
            Marker::True => 0xc3,
            Marker::F32 => 0xca,
            Marker::F64 => 0xcb,
            Marker::U8 => 0xcc,
            Marker::U16 => 0xcd,
            Marker::U32 => 0xce,
            Marker::U64 => 0xcf,
            Marker::I8 => 0xd0,
            Marker::I16 => 0xd1,
            Marker::I32 => 0xd2,
            Marker::I64 => 0xd3,
            Marker::Raw16 => 0xda,
            Marker::Raw32 => 0xdb,
            Marker::Array16 => 0xdc,
            Marker::Array32 => 0xdd,
            Marker::Map16 => 0xde,
            Marker::Map32 => 0xdf,
            Marker::FixNeg(v) => v as u8,
            Marker::Reserved(v) => v,
        }
    }

    /// The number of bytes that must directly follow the marker before it can be interpreted:
    /// the scalar payload for numbers, the length field for the non-fix raws and containers.
    /// Raw content bytes are not included, their count only becomes known from this material.
    #[inline]
    pub fn fixed_len(self) -> usize {
        match self {
            Marker::U8 | Marker::I8 => 1,
            Marker::U16 | Marker::I16 | Marker::Raw16 | Marker::Array16 | Marker::Map16 => 2,
            Marker::F32 | Marker::U32 | Marker::I32 | Marker::Raw32 | Marker::Array32 | Marker::Map32 => 4,
            Marker::F64 | Marker::U64 | Marker::I64 => 8,
            _ => 0,
        }
    }

}
