//! Encoding is split into two layers. The `write_*` functions emit a single tag plus payload for
//! one scalar, raw or container header, always choosing the narrowest representation that fits
//! the magnitude; they are what the serde serializer drives directly. [`Packer`](Packer) walks a
//! [`Value`](crate::Value) tree over them with a bounded recursion budget.

use crate::error::EncodeError;
use crate::marker::Marker;
use crate::value::{Sign, Value};
use crate::DEFAULT_MAX_DEPTH;
use std::io::Write;

/// Encode a single value into a fresh byte vector using the default nesting limit.
pub fn pack(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    Packer::encode(value, &mut buf)?;
    Ok(buf)
}

pub fn write_nil<W: Write>(w: &mut W) -> Result<usize, EncodeError> {
    w.write_all(&[Marker::Nil.to_u8()])?;
    Ok(1)
}

pub fn write_bool<W: Write>(w: &mut W, v: bool) -> Result<usize, EncodeError> {
    w.write_all(&[match v { true => Marker::True, false => Marker::False }.to_u8()])?;
    Ok(1)
}

/// The width checks run narrowest to widest on the full 64 bit magnitude, so a value is never
/// truncated into a representation it does not fit.
pub fn write_uint<W: Write>(w: &mut W, v: u64) -> Result<usize, EncodeError> {
    if v < 1 << 7 {
        w.write_all(&[Marker::FixPos(v as u8).to_u8()])?;
        Ok(1)
    } else if v < 1 << 8 {
        w.write_all(&[Marker::U8.to_u8(), v as u8])?;
        Ok(2)
    } else if v < 1 << 16 {
        w.write_all(&[Marker::U16.to_u8()])?;
        w.write_all(&(v as u16).to_be_bytes())?;
        Ok(3)
    } else if v < 1 << 32 {
        w.write_all(&[Marker::U32.to_u8()])?;
        w.write_all(&(v as u32).to_be_bytes())?;
        Ok(5)
    } else {
        w.write_all(&[Marker::U64.to_u8()])?;
        w.write_all(&v.to_be_bytes())?;
        Ok(9)
    }
}

pub fn write_int<W: Write>(w: &mut W, v: i64) -> Result<usize, EncodeError> {
    if v >= 0 {
        write_uint(w, v as u64)
    } else if v >= -32 {
        w.write_all(&[Marker::FixNeg(v as i8).to_u8()])?;
        Ok(1)
    } else if v >= -(1 << 7) {
        w.write_all(&[Marker::I8.to_u8(), v as i8 as u8])?;
        Ok(2)
    } else if v >= -(1 << 15) {
        w.write_all(&[Marker::I16.to_u8()])?;
        w.write_all(&(v as i16).to_be_bytes())?;
        Ok(3)
    } else if v >= -(1 << 31) {
        w.write_all(&[Marker::I32.to_u8()])?;
        w.write_all(&(v as i32).to_be_bytes())?;
        Ok(5)
    } else {
        w.write_all(&[Marker::I64.to_u8()])?;
        w.write_all(&v.to_be_bytes())?;
        Ok(9)
    }
}

/// Negative integer from its magnitude. Negative zero normalizes to positive zero; a magnitude
/// beyond `1 << 63` does not fit any wire width and is rejected.
pub fn write_neg<W: Write>(w: &mut W, magnitude: u64) -> Result<usize, EncodeError> {
    if magnitude == 0 {
        write_uint(w, 0)
    } else if magnitude > 1 << 63 {
        Err(EncodeError::Int(magnitude))
    } else {
        write_int(w, magnitude.wrapping_neg() as i64)
    }
}

pub fn write_f32<W: Write>(w: &mut W, v: f32) -> Result<usize, EncodeError> {
    w.write_all(&[Marker::F32.to_u8()])?;
    w.write_all(&v.to_be_bytes())?;
    Ok(5)
}

pub fn write_f64<W: Write>(w: &mut W, v: f64) -> Result<usize, EncodeError> {
    w.write_all(&[Marker::F64.to_u8()])?;
    w.write_all(&v.to_be_bytes())?;
    Ok(9)
}

pub fn write_raw_len<W: Write>(w: &mut W, len: usize) -> Result<usize, EncodeError> {
    if len < 32 {
        w.write_all(&[Marker::FixRaw(len as u8).to_u8()])?;
        Ok(1)
    } else if len < 1 << 16 {
        w.write_all(&[Marker::Raw16.to_u8()])?;
        w.write_all(&(len as u16).to_be_bytes())?;
        Ok(3)
    } else if len <= u32::MAX as usize {
        w.write_all(&[Marker::Raw32.to_u8()])?;
        w.write_all(&(len as u32).to_be_bytes())?;
        Ok(5)
    } else {
        Err(EncodeError::Length(len))
    }
}

pub fn write_raw<W: Write>(w: &mut W, bytes: &[u8]) -> Result<usize, EncodeError> {
    let c = write_raw_len(w, bytes.len())?;
    w.write_all(bytes)?;
    Ok(c + bytes.len())
}

pub fn write_array_len<W: Write>(w: &mut W, len: usize) -> Result<usize, EncodeError> {
    if len < 16 {
        w.write_all(&[Marker::FixArray(len as u8).to_u8()])?;
        Ok(1)
    } else if len < 1 << 16 {
        w.write_all(&[Marker::Array16.to_u8()])?;
        w.write_all(&(len as u16).to_be_bytes())?;
        Ok(3)
    } else if len <= u32::MAX as usize {
        w.write_all(&[Marker::Array32.to_u8()])?;
        w.write_all(&(len as u32).to_be_bytes())?;
        Ok(5)
    } else {
        Err(EncodeError::Length(len))
    }
}

pub fn write_map_len<W: Write>(w: &mut W, len: usize) -> Result<usize, EncodeError> {
    if len < 16 {
        w.write_all(&[Marker::FixMap(len as u8).to_u8()])?;
        Ok(1)
    } else if len < 1 << 16 {
        w.write_all(&[Marker::Map16.to_u8()])?;
        w.write_all(&(len as u16).to_be_bytes())?;
        Ok(3)
    } else if len <= u32::MAX as usize {
        w.write_all(&[Marker::Map32.to_u8()])?;
        w.write_all(&(len as u32).to_be_bytes())?;
        Ok(5)
    } else {
        Err(EncodeError::Length(len))
    }
}

/// Escape hatch for types outside the [`Value`](Value) domain: implement this to describe how a
/// type lowers into the native domain, then hand it to [`Packer::encode_with`]. A failing
/// implementation surfaces its own error and aborts the encode.
pub trait Packable {
    fn to_value(&self) -> Result<Value, EncodeError>;
}

/// Used to encode `paket` values. On failure the caller must discard the written output: bytes
/// already handed to the writer are not unwritten.
pub struct Packer<'w, W: Write> {
    writer: &'w mut W,
    limit: usize,
}

impl<'w, W: Write> Packer<'w, W> {

    /// Encode a value to the given writer with the default nesting limit. The resulting `usize`
    /// is the amount of bytes that got written.
    pub fn encode(value: &Value, writer: &'w mut W) -> Result<usize, EncodeError> {
        Self::encode_bounded(value, writer, DEFAULT_MAX_DEPTH)
    }

    /// Like [`encode`](Packer::encode) with an explicit nesting limit.
    pub fn encode_bounded(value: &Value, writer: &'w mut W, limit: usize) -> Result<usize, EncodeError> {
        Self { writer, limit }.encode_inner(value, limit)
    }

    /// Lower a foreign type through its [`Packable`](Packable) implementation and encode the
    /// result. The lowering step itself consumes one unit of the recursion budget.
    pub fn encode_with<T: Packable>(value: &T, writer: &'w mut W) -> Result<usize, EncodeError> {
        let value = value.to_value()?;
        let limit = DEFAULT_MAX_DEPTH;
        Self { writer, limit }.encode_inner(&value, limit - 1)
    }

    fn encode_inner(&mut self, value: &Value, budget: usize) -> Result<usize, EncodeError> {
        let mut c = 0;
        match value {
            Value::Nil => write_nil(self.writer),
            Value::Bool(v) => write_bool(self.writer, *v),
            Value::Int(Sign::Pos, v) => write_uint(self.writer, *v),
            Value::Int(Sign::Neg, v) => write_neg(self.writer, *v),
            Value::F32(v) => write_f32(self.writer, *v),
            Value::F64(v) => write_f64(self.writer, *v),
            Value::Raw(v) => write_raw(self.writer, v),
            Value::Array(inner) => {
                if budget == 0 {
                    return Err(EncodeError::Depth(self.limit));
                }
                c += write_array_len(self.writer, inner.len())?;
                for element in inner.iter() {
                    c += self.encode_inner(element, budget - 1)?;
                }
                Ok(c)
            },
            Value::Map(inner) => {
                if budget == 0 {
                    return Err(EncodeError::Depth(self.limit));
                }
                c += write_map_len(self.writer, inner.len())?;
                for (key, val) in inner.iter() {
                    c += self.encode_inner(key, budget - 1)?;
                    c += self.encode_inner(val, budget - 1)?;
                }
                Ok(c)
            },
        }
    }

}

#[cfg(test)]
mod tests {
    use super::{pack, Packable, Packer};
    use crate::error::EncodeError;
    use crate::value::{Sign, Value};

    #[test]
    fn uint_widths() {
        assert_eq!(vec![0x00], pack(&Value::from(0u64)).unwrap());
        assert_eq!(vec![0x7f], pack(&Value::from(127u64)).unwrap());
        assert_eq!(vec![0xcc, 0x80], pack(&Value::from(128u64)).unwrap());
        assert_eq!(vec![0xcc, 0xff], pack(&Value::from(255u64)).unwrap());
        assert_eq!(vec![0xcd, 0x01, 0x00], pack(&Value::from(256u64)).unwrap());
        assert_eq!(vec![0xcd, 0xff, 0xff], pack(&Value::from(65535u64)).unwrap());
        assert_eq!(vec![0xce, 0x00, 0x01, 0x00, 0x00], pack(&Value::from(65536u64)).unwrap());
        assert_eq!(vec![0xce, 0xff, 0xff, 0xff, 0xff], pack(&Value::from(u32::MAX as u64)).unwrap());
        assert_eq!(vec![0xcf, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00], pack(&Value::from(1u64 << 32)).unwrap());
        assert_eq!(vec![0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff], pack(&Value::from(u64::MAX)).unwrap());
    }

    #[test]
    fn int_widths() {
        assert_eq!(vec![0xff], pack(&Value::from(-1i64)).unwrap());
        assert_eq!(vec![0xe0], pack(&Value::from(-32i64)).unwrap());
        assert_eq!(vec![0xd0, 0xdf], pack(&Value::from(-33i64)).unwrap());
        assert_eq!(vec![0xd0, 0x80], pack(&Value::from(-128i64)).unwrap());
        assert_eq!(vec![0xd1, 0xff, 0x7f], pack(&Value::from(-129i64)).unwrap());
        assert_eq!(vec![0xd1, 0x80, 0x00], pack(&Value::from(-32768i64)).unwrap());
        assert_eq!(vec![0xd2, 0xff, 0xff, 0x7f, 0xff], pack(&Value::from(-32769i64)).unwrap());
        assert_eq!(vec![0xd2, 0x80, 0x00, 0x00, 0x00], pack(&Value::from(-(1i64 << 31))).unwrap());
        assert_eq!(vec![0xd3, 0xff, 0xff, 0xff, 0xff, 0x7f, 0xff, 0xff, 0xff], pack(&Value::from(-(1i64 << 31) - 1)).unwrap());
        assert_eq!(vec![0xd3, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], pack(&Value::from(i64::MIN)).unwrap());
    }

    #[test]
    fn negative_zero_normalizes() {
        assert_eq!(vec![0x00], pack(&Value::Int(Sign::Neg, 0)).unwrap());
    }

    #[test]
    fn negative_magnitude_overflow() {
        assert_eq!(
            vec![0xd3, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            pack(&Value::Int(Sign::Neg, 1 << 63)).unwrap()
        );
        assert!(matches!(pack(&Value::Int(Sign::Neg, (1 << 63) + 1)), Err(EncodeError::Int(_))));
    }

    #[test]
    fn floats() {
        assert_eq!(vec![0xca, 0x3f, 0x00, 0x00, 0x00], pack(&Value::F32(0.5)).unwrap());
        assert_eq!(vec![0xcb, 0x3f, 0xd0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], pack(&Value::F64(0.25)).unwrap());
    }

    #[test]
    fn raw_boundaries() {
        let encoded = pack(&Value::Raw(vec![0xaa; 31])).unwrap();
        assert_eq!(0xbf, encoded[0]);
        assert_eq!(32, encoded.len());
        let encoded = pack(&Value::Raw(vec![0xaa; 32])).unwrap();
        assert_eq!(&[0xda, 0x00, 0x20], &encoded[..3]);
        assert_eq!(35, encoded.len());
        let encoded = pack(&Value::Raw(vec![0xaa; 65535])).unwrap();
        assert_eq!(&[0xda, 0xff, 0xff], &encoded[..3]);
        let encoded = pack(&Value::Raw(vec![0xaa; 65536])).unwrap();
        assert_eq!(&[0xdb, 0x00, 0x01, 0x00, 0x00], &encoded[..5]);
    }

    #[test]
    fn container_boundaries() {
        let encoded = pack(&Value::Array(vec![Value::Nil; 15])).unwrap();
        assert_eq!(0x9f, encoded[0]);
        let encoded = pack(&Value::Array(vec![Value::Nil; 16])).unwrap();
        assert_eq!(&[0xdc, 0x00, 0x10], &encoded[..3]);
        let encoded = pack(&Value::Array(vec![Value::Nil; 65536])).unwrap();
        assert_eq!(&[0xdd, 0x00, 0x01, 0x00, 0x00], &encoded[..5]);
        let pairs = vec![(Value::Nil, Value::Nil); 16];
        let encoded = pack(&Value::Map(pairs)).unwrap();
        assert_eq!(&[0xde, 0x00, 0x10], &encoded[..3]);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(vec![0x90], pack(&Value::Array(Vec::new())).unwrap());
        assert_eq!(vec![0x80], pack(&Value::Map(Vec::new())).unwrap());
    }

    #[test]
    fn depth_limit() {
        let mut nested = Value::Nil;
        for _ in 0..4 {
            nested = Value::Array(vec![nested]);
        }
        let mut buf = Vec::new();
        assert!(Packer::encode_bounded(&nested, &mut buf, 4).is_ok());
        buf.clear();
        assert!(matches!(Packer::encode_bounded(&nested, &mut buf, 3), Err(EncodeError::Depth(3))));
    }

    #[test]
    fn fallback_hook() {
        struct Duration { secs: u64, nanos: u32 }
        impl Packable for Duration {
            fn to_value(&self) -> Result<Value, EncodeError> {
                Ok(Value::Array(vec![Value::from(self.secs), Value::from(self.nanos)]))
            }
        }
        let mut buf = Vec::new();
        Packer::encode_with(&Duration { secs: 3, nanos: 14 }, &mut buf).unwrap();
        assert_eq!(vec![0x92, 0x03, 0x0e], buf);
    }

    #[test]
    fn known_message() {
        let value = Value::Map(vec![
            (Value::from("a"), Value::from(1u8)),
            (Value::from("b"), Value::Array(vec![Value::from(1u8), Value::from(2u8), Value::from(3u8)])),
        ]);
        assert_eq!(
            vec![0x82, 0xa1, 0x61, 0x01, 0xa1, 0x62, 0x93, 0x01, 0x02, 0x03],
            pack(&value).unwrap()
        );
    }

}
