//! A compact, self-describing binary codec for dynamic values: the payload format spoken between
//! a control node and its agents. Eight kinds of value — nil, booleans, integers, floats, raw
//! byte strings, arrays and maps — become a byte stream and back, with every value carrying its
//! own length so that message boundaries need no framing above the stream.
//!
//! Encoding always picks the narrowest representation a magnitude fits: integers up to 127 cost
//! a single byte, short raws and small containers fold their length into the tag. Decoding
//! works either one-shot from a complete buffer ([`unpack`](unpack)) or incrementally from a
//! live connection ([`Unpacker`](Unpacker)), which tolerates input split at arbitrary points —
//! even inside a tag's payload — and resumes without re-parsing.
//!
//! # Examples
//!
//! ```
//! use paket::{pack, unpack, Value};
//!
//! let value = Value::Map(vec![
//!     ("a".into(), 1u8.into()),
//!     ("b".into(), Value::Array(vec![1u8.into(), 2u8.into(), 3u8.into()])),
//! ]);
//! let bytes = pack(&value).unwrap();
//! assert_eq!(bytes, [
//!     0x82,             // map of 2 pairs
//!     0xa1, 0x61,       // raw of length 1, 'a'
//!     0x01,             // positive fixnum 1
//!     0xa1, 0x62,       // raw of length 1, 'b'
//!     0x93,             // array of 3 elements
//!     0x01, 0x02, 0x03, // positive fixnums 1, 2, 3
//! ]);
//! assert_eq!(value, unpack(&bytes).unwrap());
//! ```
//!
//! Streaming decode from chunks of arbitrary size:
//!
//! ```
//! use paket::{Unpacker, Value};
//!
//! let mut unpacker = Unpacker::new();
//! unpacker.feed(&[0xa5, 0x68, 0x65]).unwrap();      // raw of length 5, "he"...
//! assert_eq!(None, unpacker.next_value().unwrap()); // ...is not decodable yet
//! unpacker.feed(&[0x6c, 0x6c, 0x6f]).unwrap();
//! assert_eq!(Some(Value::from("hello")), unpacker.next_value().unwrap());
//! ```

mod buffer;
mod error;
mod marker;
mod pack;
mod unpack;
mod value;

pub use buffer::*;
pub use error::*;
pub use marker::*;
pub use pack::*;
pub use unpack::*;
pub use value::*;

/// Default bound on container nesting, shared by encoder and decoder. Values nested exactly this
/// deep pass, one level deeper fails with a depth error.
pub const DEFAULT_MAX_DEPTH: usize = 511;
