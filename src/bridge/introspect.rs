//! Recovers a struct's declared shape from its serde Deserialize impl.
//!
//! The introspector answers the first deserialize call with an error, so only the
//! outermost shape is read and no field is ever visited.

use serde::de::{self, Deserialize, Deserializer, Visitor};

use crate::error::Error;


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shape {
    name: &'static str,
    fields: &'static [&'static str],
}

struct ShapeProbe<'a> {
    shape: &'a mut Option<Shape>,
}


impl Shape {
    /// Serialized name and field names of a struct type.
    pub fn of<'de, T: Deserialize<'de>>() -> Result<Self, Error> {
        let mut shape = None;
        let _ = T::deserialize(ShapeProbe { shape: &mut shape });
        shape.ok_or_else(|| {
            Error::prim(
                "reflect",
                format!("{} is not a struct", std::any::type_name::<T>()),
            )
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }
}


impl<'de, 'a> Deserializer<'de> for ShapeProbe<'a> {
    type Error = de::value::Error;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        *self.shape = Some(Shape { name, fields });
        Err(de::Error::custom("shape recorded"))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf option unit unit_struct newtype_struct seq tuple tuple_struct
        map enum identifier ignored_any
    }
}


#[cfg(test)]
#[path = "./introspect_test.rs"]
mod introspect_test;
