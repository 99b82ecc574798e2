//! Host-side values the bridge moves across the object-model boundary.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::host_deserializer::HostDeserializer;
use super::host_serializer::HostSerializer;
use crate::error::Error;


#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum HostValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Registered class, by name.
    Class(String),
    /// Dotted package path; the empty path is the top-level package.
    Package(String),
    Instance(InstanceId),
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct InstanceId(usize);

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HostInstance {
    class: String,
    fields: BTreeMap<String, HostValue>,
}

/// Heap of host instances referenced by HostValue::Instance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Instances(Vec<HostInstance>);


impl HostValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Nil => "Nil",
            HostValue::Boolean(_) => "Boolean",
            HostValue::Integer(_) => "Integer",
            HostValue::Float(_) => "Float",
            HostValue::Text(_) => "String",
            HostValue::Class(_) => "Class",
            HostValue::Package(_) => "Package",
            HostValue::Instance(_) => "Instance",
        }
    }
}

impl HostInstance {
    pub fn new<S: Into<String>>(class: S, fields: BTreeMap<String, HostValue>) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &BTreeMap<String, HostValue> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&HostValue, Error> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::prim("field", format!("{} has no field {}", self.class, name)))
    }

    pub fn set_field(&mut self, name: &str, value: HostValue) -> Result<(), Error> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::prim(
                "field",
                format!("{} has no field {}", self.class, name),
            )),
        }
    }
}

impl Instances {
    pub fn alloc(&mut self, instance: HostInstance) -> InstanceId {
        self.0.push(instance);
        InstanceId(self.0.len() - 1)
    }

    pub fn get(&self, id: InstanceId) -> Result<&HostInstance, Error> {
        self.0
            .get(id.0)
            .ok_or_else(|| Error::prim("instance", format!("No instance {}", id)))
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Result<&mut HostInstance, Error> {
        self.0
            .get_mut(id.0)
            .ok_or_else(|| Error::prim("instance", format!("No instance {}", id)))
    }

    /// Shallow copy of an instance under a new id.
    pub fn duplicate(&mut self, id: InstanceId) -> Result<InstanceId, Error> {
        let copy = self.get(id)?.clone();
        Ok(self.alloc(copy))
    }

    /// Converts a Rust value into a HostValue, allocating structs as
    /// instances.
    pub fn store<T: Serialize>(&mut self, value: &T) -> Result<HostValue, Error> {
        let mut serializer = HostSerializer::new(self);
        value.serialize(&mut serializer)
    }

    pub fn load<T: DeserializeOwned>(&self, value: HostValue) -> Result<T, Error> {
        T::deserialize(HostDeserializer::new(self, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}


impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Nil => write!(f, "null"),
            HostValue::Boolean(b) => write!(f, "{}", b),
            HostValue::Integer(i) => write!(f, "{}", i),
            HostValue::Float(v) => write!(f, "{:?}", v),
            HostValue::Text(s) => write!(f, "{:?}", s),
            HostValue::Class(name) => write!(f, "{} class", name),
            HostValue::Package(path) if path.is_empty() => write!(f, "host"),
            HostValue::Package(path) => write!(f, "package {}", path),
            HostValue::Instance(id) => write!(f, "{}", id),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Boolean(b)
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        HostValue::Integer(i)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Text(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Text(s)
    }
}
