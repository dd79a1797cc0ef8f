//! Serde bindings for the paket wire format. Rust data structures serialize to the same bytes
//! the dynamic [`Value`](paket::Value) encoder would produce: structs and maps become wire maps
//! with raw string keys, sequences become arrays, enum variants become either a bare raw (unit
//! variants) or a single-pair map from variant name to content.
//!
//! Deserialization borrows from the input where it can: `&str` and `&[u8]` fields point straight
//! into the source buffer.
//!
//! ```
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Msg {
//!     id: u32,
//!     tags: Vec<String>,
//! }
//!
//! let msg = Msg { id: 7, tags: vec!["a".to_string(), "b".to_string()] };
//! let bytes = paket_serde::to_bytes(&msg).unwrap();
//! assert_eq!(bytes, [
//!     0x82,                         // map of 2 pairs
//!     0xa2, 0x69, 0x64,             // "id"
//!     0x07,                         // 7
//!     0xa4, 0x74, 0x61, 0x67, 0x73, // "tags"
//!     0x92,                         // array of 2
//!     0xa1, 0x61,                   // "a"
//!     0xa1, 0x62,                   // "b"
//! ]);
//! assert_eq!(msg, paket_serde::from_bytes(&bytes).unwrap());
//! ```

mod de;
mod error;
mod ser;

pub use de::{from_bytes, Deserializer};
pub use error::{DeserializationError, Error, Result};
pub use ser::{to_bytes, to_writer, Serializer};

#[cfg(test)]
mod tests {

    use serde::{Serialize, Deserialize};
    use std::collections::HashMap;
    use std::fmt::Debug;

    fn assert_roundtrip<'de, T: Serialize + Deserialize<'de> + PartialEq + Debug>(value: T, buf: &'de mut Vec<u8>) {
        *buf = super::to_bytes(&value).unwrap();
        assert_eq!(value, super::from_bytes(buf).unwrap());
    }

    #[test]
    fn primitives() {
        assert_roundtrip((), &mut Vec::new());
        assert_roundtrip(true, &mut Vec::new());
        assert_roundtrip(false, &mut Vec::new());
        assert_roundtrip(0u8, &mut Vec::new());
        assert_roundtrip(255u8, &mut Vec::new());
        assert_roundtrip(65535u16, &mut Vec::new());
        assert_roundtrip(u32::MAX, &mut Vec::new());
        assert_roundtrip(u64::MAX, &mut Vec::new());
        assert_roundtrip(-1i8, &mut Vec::new());
        assert_roundtrip(i8::MIN, &mut Vec::new());
        assert_roundtrip(i16::MIN, &mut Vec::new());
        assert_roundtrip(i32::MIN, &mut Vec::new());
        assert_roundtrip(i64::MIN, &mut Vec::new());
        assert_roundtrip(0.5f32, &mut Vec::new());
        assert_roundtrip(0.25f64, &mut Vec::new());
        assert_roundtrip('ä', &mut Vec::new());
        assert_roundtrip(String::from("hello world"), &mut Vec::new());
    }

    #[test]
    fn borrowed_str() {
        let buf = super::to_bytes(&"zero copy").unwrap();
        let out: &str = super::from_bytes(&buf).unwrap();
        assert_eq!("zero copy", out);
    }

    #[test]
    fn byte_strings() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Blob(#[serde(with = "serde_bytes")] Vec<u8>);
        assert_roundtrip(Blob(vec![0x00, 0xff, 0x80]), &mut Vec::new());
        assert_roundtrip(Blob(Vec::new()), &mut Vec::new());
    }

    #[test]
    fn options() {
        assert_roundtrip(Option::<u32>::None, &mut Vec::new());
        assert_roundtrip(Some(12u32), &mut Vec::new());
        assert_roundtrip(Some(Option::<bool>::None), &mut Vec::new());
        assert_roundtrip(vec![Some(1u8), None, Some(3u8)], &mut Vec::new());
    }

    #[test]
    fn structs() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Unit;
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Newtype(u64);
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Tuple(u8, bool, String);
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Plain {
            port: u16,
            host: String,
            retry: Option<u32>,
        }
        assert_roundtrip(Unit, &mut Vec::new());
        assert_roundtrip(Newtype(1 << 40), &mut Vec::new());
        assert_roundtrip(Tuple(9, false, "x".to_string()), &mut Vec::new());
        assert_roundtrip(Plain { port: 4505, host: "master".to_string(), retry: None }, &mut Vec::new());
    }

    #[test]
    fn non_string_map_keys() {
        let mut map = HashMap::new();
        map.insert(1usize, "one".to_string());
        map.insert(2usize, "two".to_string());
        assert_roundtrip(map, &mut Vec::new());
    }

    #[test]
    fn enums() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        enum Event {
            Ping,
            Payload(Vec<u8>),
            Pair(u32, u32),
            Auth { token: String, expiry: Option<u64> },
        }
        assert_roundtrip(Event::Ping, &mut Vec::new());
        assert_roundtrip(Event::Payload(vec![1, 2, 3]), &mut Vec::new());
        assert_roundtrip(Event::Pair(4505, 4506), &mut Vec::new());
        assert_roundtrip(Event::Auth { token: "t0k3n".to_string(), expiry: None }, &mut Vec::new());
    }

    #[test]
    fn unit_variant_wire_shape() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        enum Flag { On }
        // a bare raw, not a map
        assert_eq!(super::to_bytes(&Flag::On).unwrap(), [0xa2, 0x4f, 0x6e]);
    }

    #[test]
    fn nested() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Job {
            id: u64,
            args: Vec<String>,
            env: HashMap<String, String>,
        }
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/usr/bin".to_string());
        let jobs = vec![
            Job { id: 1, args: vec!["state.apply".to_string()], env },
            Job { id: 2, args: Vec::new(), env: HashMap::new() },
        ];
        assert_roundtrip(jobs, &mut Vec::new());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut buf = super::to_bytes(&1u8).unwrap();
        buf.push(0x00);
        assert!(super::from_bytes::<u8>(&buf).is_err());
    }

    #[test]
    fn wrong_type_reported() {
        let buf = super::to_bytes(&"text").unwrap();
        let err = super::from_bytes::<bool>(&buf).unwrap_err();
        assert!(err.to_string().contains("expected one of (True, False)"));
    }

    #[test]
    fn integer_overflow_reported() {
        let buf = super::to_bytes(&300u16).unwrap();
        assert!(super::from_bytes::<u8>(&buf).is_err());
    }
}
