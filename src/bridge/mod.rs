//! Reflection bridge between host values and Agora objects.
//!
//! Going up wraps a HostValue in an AgoraObject whose generator is built
//! from the value's class (or package) and memoized per (name, level).
//! Going down hands the payload back for native calls.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;

use bimap::BiMap;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::model::{AgoraObject, Generator, GeneratorId, Table};
use crate::pattern::Pattern;
use crate::universe::Universe;

// Public exports.
pub use class::{
    constructor_pattern, method_pattern, package_leaf, Binding, ClassRegistry, ClassSpec, Level,
    NativeFn, SurfaceEntry,
};
pub use host_value::{HostInstance, HostValue, InstanceId, Instances};
pub use introspect::Shape;
pub use wrappers::{wrapper_for, OBJECT, WRAPPER_PACKAGE};

// Public mods.
pub mod class;
pub mod host_value;
pub mod introspect;
pub mod wrappers;

// Private mods.
mod host_deserializer;
mod host_serializer;


/// Bridge state that persists with an image.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Bridge {
    cache: BiMap<CacheKey, GeneratorId>,
    instances: Instances,
    /// Wrapping generator linking Object to the root identity.
    root_link: GeneratorId,
}

/// Memoization key of a bridge-built generator.
///
/// Serialized as `Level:name` so the cache can be a JSON map.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct CacheKey {
    name: String,
    level: Level,
}


impl Bridge {
    pub fn new(root_link: GeneratorId) -> Self {
        Self {
            cache: BiMap::new(),
            instances: Instances::default(),
            root_link,
        }
    }

    pub fn instances(&self) -> &Instances {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut Instances {
        &mut self.instances
    }

    pub fn root_link(&self) -> GeneratorId {
        self.root_link
    }

    pub fn cached(&self, key: &CacheKey) -> Option<GeneratorId> {
        self.cache.get_by_left(key).copied()
    }

    /// Key a generator was built for, if the bridge built it.
    pub fn key_of(&self, generator: GeneratorId) -> Option<&CacheKey> {
        self.cache.get_by_right(&generator)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Field of the host instance behind `receiver`.
    pub fn read_field(&self, receiver: &HostValue, name: &str) -> Result<HostValue, Error> {
        match receiver {
            HostValue::Instance(id) => Ok(self.instances.get(*id)?.field(name)?.clone()),
            other => Err(Error::prim(
                "field",
                format!("{} has no field {}", other, name),
            )),
        }
    }

    pub fn write_field(
        &mut self,
        receiver: &HostValue,
        name: &str,
        value: HostValue,
    ) -> Result<(), Error> {
        match receiver {
            HostValue::Instance(id) => self.instances.get_mut(*id)?.set_field(name, value),
            other => Err(Error::prim(
                "field",
                format!("{} has no field {}", other, name),
            )),
        }
    }
}

impl CacheKey {
    pub fn new<S: Into<String>>(name: S, level: Level) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        format!("{:?}:{}", key.level, key.name)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (level, name) = s
            .split_once(':')
            .ok_or_else(|| format!("Malformed cache key {:?}", s))?;
        let level = match level {
            "Instance" => Level::Instance,
            "Class" => Level::Class,
            "Package" => Level::Package,
            _ => return Err(format!("Unknown level in cache key {:?}", s)),
        };
        Ok(Self::new(name, level))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Package if self.name.is_empty() => write!(f, "host"),
            Level::Package => write!(f, "package {}", self.name),
            level => write!(f, "{}{}", self.name, level),
        }
    }
}


impl Universe {
    /// Wraps a host value as an Agora object.
    pub fn up(&mut self, value: HostValue) -> Result<AgoraObject, Error> {
        let generator = match &value {
            HostValue::Class(name) => self.class_generator(name, Level::Class)?,
            HostValue::Package(path) => self.package_generator(path)?,
            HostValue::Instance(id) => {
                let class = self.bridge().instances.get(*id)?.class().to_string();
                self.class_generator(&class, Level::Instance)?
            }
            primitive => match wrapper_for(primitive) {
                Some(wrapper) => self.class_generator(wrapper, Level::Instance)?,
                None => {
                    return Err(Error::prim(
                        "up",
                        format!("No wrapper for {}", primitive.type_name()),
                    ))
                }
            },
        };
        Ok(AgoraObject::wrapping(generator, value))
    }

    /// Host value of an actual passed to `pattern`.
    pub fn down_argument(&self, pattern: &Pattern, actual: &AgoraObject) -> Result<HostValue, Error> {
        match actual.payload() {
            Some(value) => Ok(value.clone()),
            None => err!(
                self,
                ErrorKind::ProgramError(Cow::Owned(format!("Illegal Argument for {}", pattern)))
            ),
        }
    }

    pub fn down_arguments(
        &self,
        pattern: &Pattern,
        actuals: &[AgoraObject],
    ) -> Result<Vec<HostValue>, Error> {
        actuals
            .iter()
            .map(|actual| self.down_argument(pattern, actual))
            .collect()
    }

    /// Generator answering for `name` at `level`, built on first use.
    ///
    /// Inherited members are reached through the superclass generator at the
    /// same level; Object delegates to the root identity.
    pub fn class_generator(&mut self, name: &str, level: Level) -> Result<GeneratorId, Error> {
        let key = CacheKey::new(name, level);
        if let Some(generator) = self.bridge().cached(&key) {
            return Ok(generator);
        }

        let spec = self.registry().get(name)?.clone();
        let parent = match spec.superclass() {
            Some(superclass) => self.class_generator(superclass, level)?,
            None if name == OBJECT => self.bridge().root_link,
            None => self.class_generator(OBJECT, level)?,
        };
        let table = Table::from(spec.attributes(level));
        let generator = self
            .heap_mut()
            .alloc(Generator::with_table(table, parent, None));
        debug!("Built {} as {} (parent {})", key, generator, parent);
        self.heap_mut().pin(generator);
        self.bridge_mut().cache.insert(key, generator);
        Ok(generator)
    }

    /// Generator of a package, with one constant per sub-package and class.
    pub fn package_generator(&mut self, path: &str) -> Result<GeneratorId, Error> {
        let key = CacheKey::new(path, Level::Package);
        if let Some(generator) = self.bridge().cached(&key) {
            return Ok(generator);
        }

        let parent = self.class_generator("Package", Level::Instance)?;
        let generator = self.heap_mut().alloc(Generator::internal(parent, None));
        debug!("Built {} as {}", key, generator);
        // Cached before populating so members may refer back to it.
        self.heap_mut().pin(generator);
        self.bridge_mut().cache.insert(key, generator);

        for subpackage in self.registry().subpackages(path) {
            let object = self.up(HostValue::Package(subpackage.clone()))?;
            self.declare(generator, package_leaf(&subpackage), object, false)?;
        }
        let classes = self
            .registry()
            .classes_in(path)
            .map(|spec| spec.name().to_string())
            .collect::<Vec<_>>();
        for class in classes {
            let object = self.up(HostValue::Class(class.clone()))?;
            self.declare(generator, &class, object, false)?;
        }
        Ok(generator)
    }

    /// Converts a Rust value into an Agora object.
    pub fn store<T: Serialize>(&mut self, value: &T) -> Result<AgoraObject, Error> {
        let host = self.bridge_mut().instances.store(value)?;
        self.up(host)
    }

    /// Converts an Agora object back into a Rust value.
    pub fn load<T: DeserializeOwned>(&self, object: &AgoraObject) -> Result<T, Error> {
        self.bridge().instances.load(object.down()?)
    }
}
