//! The atom of a `paket` message is the [`Value`](Value), a closed union of the eight kinds the
//! wire format can express. Values are owned: the streaming decoder hands them over the moment
//! they are complete and keeps no reference to them afterwards.

use std::iter::repeat;
use std::str::from_utf8;

/// The sign of an integer. The encoder accepts negative zero but transparently translates it to
/// positive zero, so `Int(Neg, 0)` never survives a roundtrip.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Sign { Pos, Neg }

/// The possible values according to the `paket` data model.
///
/// Integers carry a sign and a 64 bit magnitude, which covers the full wire range from
/// `-2^63` to `2^64 - 1`; a negative magnitude above `1 << 63` is unencodable. Text has no wire
/// type of its own: strings enter `Raw` as UTF-8 bytes via the `From` conversions and stay bytes
/// on decode. `Map` is a list of pairs rather than a hash map, because values (floats!) are
/// neither `Ord` nor `Hash` and because the wire makes no ordering promise beyond "pairs appear
/// in the order they were encoded" — which the list preserves exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(Sign, u64),
    F32(f32),
    F64(f64),
    Raw(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {

    pub fn name(&self) -> &'static str {
        match *self {
            Self::Nil => "Nil",
            Self::Bool(_) => "Bool",
            Self::Int(_, _) => "Int",
            Self::F32(_) => "F32",
            Self::F64(_) => "F64",
            Self::Raw(_) => "Raw",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
        }
    }

    fn b64(input: &[u8]) -> String {
        const CHAR_SET: &'static [char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N',
            'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
            'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '+', '/'
        ];
        let mut array = [0; 4];
        input.chunks(3).flat_map(|chunk| {
            let len = chunk.len();
            array[1..1 + len].copy_from_slice(chunk);
            for i in 0..(3 - len) {
                array[3 - i] = 0;
            }
            let x = u32::from_be_bytes(array);
            (0..=len).map(move |o| CHAR_SET[(x >> (18 - 6*o) & 0x3f) as usize]).chain(repeat('=').take(3-len))
        }).collect()
    }

}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil          => f.write_str("null"),
            Value::Bool(true)   => f.write_str("true"),
            Value::Bool(false)  => f.write_str("false"),
            Value::Int(s, v)    => write!(f, "{}{}", match s { Sign::Pos => "", Sign::Neg => "-" }, v),
            Value::F32(v)       => write!(f, "${}", v),
            Value::F64(v)       => write!(f, "$${}", v),
            Value::Raw(v)       => match from_utf8(v) {
                Ok(text) => write!(f, "\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")),
                Err(_)   => write!(f, "'{}'", Self::b64(v).as_str()),
            },
            Value::Array(v)    => write!(f, "[\n{}\n]", v.iter()
                .flat_map(|e| format!("{},", e).lines().map(|line| format!("  {}", line)).collect::<Vec<String>>())
                .collect::<Vec<String>>().join("\n")),
            Value::Map(v)       => write!(f, "{{\n{}\n}}", v.iter()
                .flat_map(|(k, e)| format!("{}: {},", k, e).lines().map(|line| format!("  {}", line)).collect::<Vec<String>>())
                .collect::<Vec<String>>().join("\n")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        Value::Int(Sign::Pos, v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        if v < 0 {
            Value::Int(Sign::Neg, v.unsigned_abs())
        } else {
            Value::Int(Sign::Pos, v as u64)
        }
    }
}

macro_rules! from_int {
    ($($unsigned:ty),*; $($signed:ty),*) => {
        $(impl From<$unsigned> for Value {
            fn from(v: $unsigned) -> Value {
                Value::from(v as u64)
            }
        })*
        $(impl From<$signed> for Value {
            fn from(v: $signed) -> Value {
                Value::from(v as i64)
            }
        })*
    }
}

from_int!(u8, u16, u32, usize; i8, i16, i32, isize);

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Raw(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Raw(v.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Value {
        Value::Raw(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Raw(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::Array(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(v: Vec<(Value, Value)>) -> Value {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        match v {
            Some(inner) => inner.into(),
            None => Value::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Sign, Value};

    #[test]
    fn conversions() {
        assert_eq!(Value::Int(Sign::Pos, 7), Value::from(7u8));
        assert_eq!(Value::Int(Sign::Neg, 7), Value::from(-7i32));
        assert_eq!(Value::Int(Sign::Neg, 1 << 63), Value::from(i64::MIN));
        assert_eq!(Value::Raw(b"katze".to_vec()), Value::from("katze"));
        assert_eq!(Value::Nil, Value::from(None::<u8>));
        assert_eq!(Value::Bool(true), Value::from(Some(true)));
    }

    #[test]
    fn display_scalars() {
        assert_eq!("null", format!("{}", Value::Nil));
        assert_eq!("-42", format!("{}", Value::from(-42i64)));
        assert_eq!("$0.5", format!("{}", Value::F32(0.5)));
        assert_eq!("$$0.25", format!("{}", Value::F64(0.25)));
        assert_eq!("\"a \\\"b\\\"\"", format!("{}", Value::from("a \"b\"")));
        assert_eq!("'/w=='", format!("{}", Value::Raw(vec![0xff])));
    }

    #[test]
    fn display_containers() {
        let value = Value::Map(vec![(Value::from("a"), Value::Array(vec![Value::from(1u8), Value::from(2u8)]))]);
        assert_eq!("{\n  \"a\": [\n    1,\n    2,\n  ],\n}", format!("{}", value));
    }

}
