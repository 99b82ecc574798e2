//! Reads Rust values back out of HostValues.
//!
//! Mirror of HostSerializer: instances are visited as maps of their fields,
//! text doubles as unit enum variants.

use std::collections::btree_map;

use log::debug;
use serde::de::value::StringDeserializer;
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, Visitor};

use super::host_value::{HostValue, Instances};
use crate::error::Error;


pub struct HostDeserializer<'a> {
    instances: &'a Instances,
    input: HostValue,
}

struct FieldAccessor<'a> {
    instances: &'a Instances,
    fields: btree_map::IntoIter<String, HostValue>,
    value: Option<HostValue>,
}


impl<'a> HostDeserializer<'a> {
    pub fn new(instances: &'a Instances, input: HostValue) -> Self {
        Self { instances, input }
    }

    fn unexpected<T>(given: &HostValue, expected: &str) -> Result<T, Error> {
        Err(Error::prim(
            "load",
            format!("Expected {}, given {}", expected, given.type_name()),
        ))
    }
}

impl<'de, 'a> de::Deserializer<'de> for HostDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            HostValue::Nil => visitor.visit_unit(),
            HostValue::Boolean(b) => visitor.visit_bool(b),
            HostValue::Integer(i) => visitor.visit_i64(i),
            HostValue::Float(v) => visitor.visit_f64(v),
            HostValue::Text(s) => visitor.visit_string(s),
            HostValue::Class(name) => visitor.visit_string(name),
            HostValue::Package(path) => visitor.visit_string(path),
            HostValue::Instance(id) => {
                let fields = self.instances.get(id)?.fields().clone();
                visitor.visit_map(FieldAccessor {
                    instances: self.instances,
                    fields: fields.into_iter(),
                    value: None,
                })
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            HostValue::Nil => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: Visitor<'de>,
    {
        debug!("Loading newtype_struct {}", name);
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: Visitor<'de>,
    {
        debug!("Loading struct {}", name);
        let id = match &self.input {
            HostValue::Instance(id) => *id,
            other => return HostDeserializer::unexpected(other, name),
        };
        let class = self.instances.get(id)?.class().to_string();
        if class != name {
            return Err(Error::prim(
                "load",
                format!("Expected {}, given {}", name, class),
            ));
        }
        self.deserialize_any(visitor)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: Visitor<'de>,
    {
        debug!("Loading enum {}", name);
        match self.input {
            HostValue::Text(variant) => {
                let variant: StringDeserializer<Error> = variant.into_deserializer();
                visitor.visit_enum(variant)
            }
            other => HostDeserializer::unexpected(&other, name),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf unit unit_struct seq tuple tuple_struct map identifier ignored_any
    }
}

impl<'de, 'a> MapAccess<'de> for FieldAccessor<'a> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.fields.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key: StringDeserializer<Error> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(HostDeserializer::new(self.instances, value)),
            None => Err(Error::prim("load", "Field value requested before key")),
        }
    }
}
