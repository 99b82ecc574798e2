//! Turns serde-serializable Rust values into HostValues.
//!
//! Scalars map onto the matching HostValue; structs become HostInstances
//! named after the struct. Sequences and data-carrying enum variants have
//! no host representation and are rejected.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use log::debug;
use serde::ser::{self, Impossible, Serialize};

use super::host_value::{HostInstance, HostValue, Instances};
use crate::error::Error;


pub struct HostSerializer<'a> {
    instances: &'a mut Instances,
}

pub struct InstanceBuilder<'a, 'b> {
    serializer: &'a mut HostSerializer<'b>,
    class: &'static str,
    fields: BTreeMap<String, HostValue>,
}


impl<'a> HostSerializer<'a> {
    pub fn new(instances: &'a mut Instances) -> Self {
        Self { instances }
    }

    fn unsupported<T>(what: &str) -> Result<T, Error> {
        Err(Error::prim(
            "store",
            format!("{} has no host representation", what),
        ))
    }
}

impl<'a, 'b> ser::Serializer for &'a mut HostSerializer<'b> {
    type Ok = HostValue;
    type Error = Error;

    type SerializeSeq = Impossible<HostValue, Error>;
    type SerializeTuple = Impossible<HostValue, Error>;
    type SerializeTupleStruct = Impossible<HostValue, Error>;
    type SerializeTupleVariant = Impossible<HostValue, Error>;
    type SerializeMap = Impossible<HostValue, Error>;
    type SerializeStruct = InstanceBuilder<'a, 'b>;
    type SerializeStructVariant = Impossible<HostValue, Error>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }
    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }
    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }
    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }
    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }
    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }
    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        match i64::try_from(v) {
            Ok(v) => self.serialize_i64(v),
            Err(_) => Err(Error::prim("store", format!("{} overflows Integer", v))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.serialize_f64(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(&v.to_string())
    }
    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Text(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok, Self::Error> {
        HostSerializer::unsupported("bytes")
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Nil)
    }
    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Nil)
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(HostValue::Nil)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        HostSerializer::unsupported(&format!("{}::{}", name, variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        HostSerializer::unsupported("seq")
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        HostSerializer::unsupported("tuple")
    }
    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        HostSerializer::unsupported(name)
    }
    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        HostSerializer::unsupported(&format!("{}::{}", name, variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        HostSerializer::unsupported("map")
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        debug!("Storing struct {}", name);
        Ok(InstanceBuilder {
            serializer: self,
            class: name,
            fields: Default::default(),
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        HostSerializer::unsupported(&format!("{}::{}", name, variant))
    }
}

impl<'a, 'b> ser::SerializeStruct for InstanceBuilder<'a, 'b> {
    type Ok = HostValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let value = value.serialize(&mut *self.serializer)?;
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let id = self
            .serializer
            .instances
            .alloc(HostInstance::new(self.class, self.fields));
        Ok(HostValue::Instance(id))
    }
}
