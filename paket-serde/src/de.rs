use serde::Deserialize;
use serde::de::{self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess, Visitor};
use paket::{DecodeError, Marker};
use std::str::from_utf8;

use crate::error::{DeserializationError, Error, Result};

/// A decoded tag with its immediate payload resolved: scalars carry their value, raws their
/// content slice, containers their element count. One step of the wire grammar.
enum Atom<'de> {
    Nil,
    Bool(bool),
    Int(i128),
    F32(f32),
    F64(f64),
    Raw(&'de [u8]),
    Array(usize),
    Map(usize),
}

impl<'de> Atom<'de> {
    fn name(&self) -> &'static str {
        match *self {
            Atom::Nil => "Nil",
            Atom::Bool(_) => "Bool",
            Atom::Int(_) => "Int",
            Atom::F32(_) => "F32",
            Atom::F64(_) => "F64",
            Atom::Raw(_) => "Raw",
            Atom::Array(_) => "Array",
            Atom::Map(_) => "Map",
        }
    }
}

pub struct Deserializer<'de> {
    input: &'de [u8],
    pos: usize,
}

impl<'de> Deserializer<'de> {
    pub fn from_bytes(input: &'de [u8]) -> Self {
        Deserializer { input, pos: 0 }
    }
}

pub fn from_bytes<'a, T: Deserialize<'a>>(s: &'a [u8]) -> std::result::Result<T, DeserializationError> {
    let mut deserializer = Deserializer::from_bytes(s);
    let t = T::deserialize(&mut deserializer).map_err(|e| e.at(deserializer.pos))?;
    if deserializer.input[deserializer.pos..].is_empty() {
        Ok(t)
    } else {
        Err(Error::Trailing.at(deserializer.pos))
    }
}

impl<'de> Deserializer<'de> {

    fn decode_atom(&mut self) -> Result<Atom<'de>> {
        let marker = self.decode_marker()?;
        Ok(match marker {
            Marker::Nil => Atom::Nil,
            Marker::True => Atom::Bool(true),
            Marker::False => Atom::Bool(false),
            Marker::FixPos(v) => Atom::Int(v as i128),
            Marker::FixNeg(v) => Atom::Int(v as i128),
            Marker::U8 => Atom::Int(self.decode_slice(1)?[0] as i128),
            Marker::U16 => Atom::Int(u16::from_be_bytes(self.decode_slice(2)?.try_into().unwrap()) as i128),
            Marker::U32 => Atom::Int(u32::from_be_bytes(self.decode_slice(4)?.try_into().unwrap()) as i128),
            Marker::U64 => Atom::Int(u64::from_be_bytes(self.decode_slice(8)?.try_into().unwrap()) as i128),
            Marker::I8 => Atom::Int(self.decode_slice(1)?[0] as i8 as i128),
            Marker::I16 => Atom::Int(i16::from_be_bytes(self.decode_slice(2)?.try_into().unwrap()) as i128),
            Marker::I32 => Atom::Int(i32::from_be_bytes(self.decode_slice(4)?.try_into().unwrap()) as i128),
            Marker::I64 => Atom::Int(i64::from_be_bytes(self.decode_slice(8)?.try_into().unwrap()) as i128),
            Marker::F32 => Atom::F32(f32::from_be_bytes(self.decode_slice(4)?.try_into().unwrap())),
            Marker::F64 => Atom::F64(f64::from_be_bytes(self.decode_slice(8)?.try_into().unwrap())),
            Marker::FixRaw(len) => Atom::Raw(self.decode_slice(len as usize)?),
            Marker::Raw16 => {
                let len = u16::from_be_bytes(self.decode_slice(2)?.try_into().unwrap()) as usize;
                Atom::Raw(self.decode_slice(len)?)
            },
            Marker::Raw32 => {
                let len = u32::from_be_bytes(self.decode_slice(4)?.try_into().unwrap()) as usize;
                Atom::Raw(self.decode_slice(len)?)
            },
            Marker::FixArray(count) => Atom::Array(count as usize),
            Marker::Array16 => Atom::Array(u16::from_be_bytes(self.decode_slice(2)?.try_into().unwrap()) as usize),
            Marker::Array32 => Atom::Array(u32::from_be_bytes(self.decode_slice(4)?.try_into().unwrap()) as usize),
            Marker::FixMap(count) => Atom::Map(count as usize),
            Marker::Map16 => Atom::Map(u16::from_be_bytes(self.decode_slice(2)?.try_into().unwrap()) as usize),
            Marker::Map32 => Atom::Map(u32::from_be_bytes(self.decode_slice(4)?.try_into().unwrap()) as usize),
            Marker::Reserved(byte) => return Err(Error::Decode(DecodeError::Reserved(byte))),
        })
    }

    fn decode_marker(&mut self) -> Result<Marker> {
        let byte = self.decode_slice(1)?[0];
        Ok(Marker::from_u8(byte))
    }

    #[inline]
    fn decode_slice(&mut self, len: usize) -> Result<&'de [u8]> {
        if self.input[self.pos..].len() < len {
            Err(Error::Decode(DecodeError::Eof))
        } else {
            self.pos += len;
            Ok(&self.input[self.pos - len..self.pos])
        }
    }

    #[inline]
    fn decode_int(&mut self) -> Result<i128> {
        match self.decode_atom()? {
            Atom::Int(v) => Ok(v),
            o => Err(Error::UnexpectedMarker(&["Int"], o.name())),
        }
    }

    fn decode_str(&mut self) -> Result<&'de str> {
        match self.decode_atom()? {
            Atom::Raw(v) => Ok(from_utf8(v)?),
            o => Err(Error::UnexpectedMarker(&["Raw"], o.name())),
        }
    }

}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Nil => visitor.visit_unit(),
            Atom::Bool(v) => visitor.visit_bool(v),
            Atom::Int(v) if v >= 0 => visitor.visit_u64(v.try_into()?),
            Atom::Int(v) => visitor.visit_i64(v.try_into()?),
            Atom::F32(v) => visitor.visit_f32(v),
            Atom::F64(v) => visitor.visit_f64(v),
            Atom::Raw(v) => match from_utf8(v) {
                Ok(s) => visitor.visit_borrowed_str(s),
                Err(_) => visitor.visit_borrowed_bytes(v),
            },
            Atom::Array(count) => visitor.visit_seq(SeqDeserializer::new(self, count)),
            Atom::Map(count) => visitor.visit_map(MapDeserializer::new(self, count)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Bool(v) => visitor.visit_bool(v),
            o => Err(Error::UnexpectedMarker(&["True", "False"], o.name())),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(self.decode_int()?.try_into()?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.decode_int()?.try_into()?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.decode_int()?.try_into()?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.decode_int()?.try_into()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(self.decode_int()?.try_into()?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.decode_int()?.try_into()?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.decode_int()?.try_into()?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.decode_int()?.try_into()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::F32(v) => visitor.visit_f32(v),
            o => Err(Error::UnexpectedMarker(&["F32"], o.name())),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::F64(v) => visitor.visit_f64(v),
            Atom::F32(v) => visitor.visit_f64(v as f64),
            o => Err(Error::UnexpectedMarker(&["F64", "F32"], o.name())),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let v = self.decode_str()?;
        let mut chars = v.chars();
        let c = chars.next().ok_or(Error::Decode(DecodeError::Eof))?;
        match chars.next() {
            Some(_) => Err(Error::Trailing),
            None => visitor.visit_char(c),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.decode_str()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Raw(v) => visitor.visit_borrowed_bytes(v),
            o => Err(Error::UnexpectedMarker(&["Raw"], o.name())),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Raw(v) => visitor.visit_byte_buf(v.to_vec()),
            Atom::Array(count) => {
                let mut bytes = Vec::with_capacity(count);
                for _ in 0..count {
                    bytes.push(self.decode_int()?.try_into()?);
                }
                visitor.visit_byte_buf(bytes)
            },
            o => Err(Error::UnexpectedMarker(&["Raw", "Array"], o.name())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        // peek: a nil consumes itself, anything else re-parses as the payload
        if self.input[self.pos..].first() == Some(&Marker::Nil.to_u8()) {
            self.pos += 1;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Nil => visitor.visit_unit(),
            o => Err(Error::UnexpectedMarker(&["Nil"], o.name())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Array(count) => visitor.visit_seq(SeqDeserializer::new(self, count)),
            o => Err(Error::UnexpectedMarker(&["Array"], o.name())),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(self, _name: &'static str, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Map(count) => visitor.visit_map(MapDeserializer::new(self, count)),
            o => Err(Error::UnexpectedMarker(&["Map"], o.name())),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(self, _name: &'static str, _fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(self, _name: &'static str, _variants: &'static [&'static str], visitor: V) -> Result<V::Value> {
        match self.decode_atom()? {
            Atom::Raw(v) => visitor.visit_enum(from_utf8(v)?.into_deserializer()),
            Atom::Map(1) => {
                let variant = self.decode_str()?;
                visitor.visit_enum(EnumDeserializer::new(self, variant))
            },
            o => Err(Error::UnexpectedMarker(&["Raw", "Map"], o.name())),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.decode_str()?)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

}

struct MapDeserializer<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'a, 'de> MapDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, remaining: usize) -> Self {
        Self { de, remaining }
    }
}

impl<'de, 'a> MapAccess<'de> for MapDeserializer<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.remaining == 0 {
            Ok(None)
        } else {
            self.remaining -= 1;
            seed.deserialize(&mut *self.de).map(Some)
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }

    #[inline]
    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct EnumDeserializer<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    variant: &'de str,
}

impl<'a, 'de> EnumDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, variant: &'de str) -> Self {
        Self { de, variant }
    }
}

impl<'de, 'a> EnumAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant =
            seed.deserialize(IntoDeserializer::<Error>::into_deserializer(self.variant))?;
        Ok((variant, self))
    }
}

impl<'de, 'a> VariantAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.de.decode_atom()? {
            Atom::Nil => Ok(()),
            o => Err(Error::UnexpectedMarker(&["Nil"], o.name())),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_struct(self.de, "", fields, visitor)
    }

}

struct SeqDeserializer<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'a, 'de> SeqDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, remaining: usize) -> Self {
        Self { de, remaining }
    }
}

impl<'de, 'a> SeqAccess<'de> for SeqDeserializer<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            Ok(None)
        } else {
            self.remaining -= 1;
            seed.deserialize(&mut *self.de).map(Some)
        }
    }

    #[inline]
    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }

}
