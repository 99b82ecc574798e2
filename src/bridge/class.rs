//! Binding tables describing host classes to the bridge.
//!
//! A ClassSpec stands in for runtime reflection: it lists a class's fields,
//! methods and constructors together with the natives implementing them.
//! Built-in wrapper types instead declare their exact surface with the
//! `surface!` macro.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::host_value::{HostValue, Instances};
use super::introspect::Shape;
use crate::error::Error;
use crate::model::{Attribute, NativeRef, Slot};
use crate::pattern::Pattern;


/// Native entry point. Receives the host receiver for instance methods and
/// constructors, None for static functions.
pub type NativeFn =
    fn(&mut Instances, Option<&HostValue>, Vec<HostValue>) -> Result<HostValue, Error>;

/// Which side of a class a generator (or native) belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Level {
    Instance,
    Class,
    Package,
}

#[derive(Clone, Debug)]
pub struct ClassSpec {
    name: String,
    package: String,
    superclass: Option<String>,
    members: Members,
}

#[derive(Clone, Debug)]
enum Members {
    Reflected {
        fields: Vec<FieldSpec>,
        methods: Vec<MethodSpec>,
        constructors: Vec<ConstructorSpec>,
    },
    Declared(Vec<SurfaceEntry>),
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    name: String,
    mutable: bool,
}

#[derive(Clone)]
pub struct MethodSpec {
    name: String,
    params: Vec<String>,
    is_static: bool,
    /// Abstract members have no native and are skipped.
    native: Option<NativeFn>,
}

#[derive(Clone)]
pub struct ConstructorSpec {
    params: Vec<String>,
    native: NativeFn,
}

#[derive(Clone, Debug)]
pub struct SurfaceEntry {
    level: Level,
    pattern: Pattern,
    binding: Binding,
}

#[derive(Clone)]
pub enum Binding {
    Method(NativeFn),
    Function(NativeFn),
    Constructor(NativeFn),
    Reifier(&'static str),
}

/// Every class the bridge may reflect, by name.
#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<String, ClassSpec>,
}


/// Builds a Vec<SurfaceEntry> from `Level Kind pattern => target` rows.
#[macro_export]
macro_rules! surface {
    [$($level:ident $kind:ident $pattern:expr => $target:expr),* $(,)?] => {
        vec![
            $(
                $crate::bridge::SurfaceEntry::new(
                    $crate::bridge::Level::$level,
                    $pattern,
                    $crate::bridge::Binding::$kind($target),
                ),
            )*
        ]
    };
}


/// Pattern of a host method: `moveBy(Integer, Integer)` ->
/// `moveByInteger:integer:`.
pub fn method_pattern<S: AsRef<str>>(name: &str, params: &[S]) -> Pattern {
    match params.split_first() {
        None => Pattern::unary(decapitalize(name)),
        Some((first, rest)) => {
            let mut keywords = vec![format!(
                "{}{}:",
                decapitalize(name),
                capitalize(first.as_ref())
            )];
            keywords.extend(rest.iter().map(|p| format!("{}:", decapitalize(p.as_ref()))));
            Pattern::keyword(keywords)
        }
    }
}

/// Pattern of a host constructor: `new` or `newType:type:`.
pub fn constructor_pattern<S: AsRef<str>>(params: &[S]) -> Pattern {
    method_pattern("new", params)
}

fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}


impl ClassSpec {
    pub fn new<S: Into<String>, P: Into<String>>(name: S, package: P) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            superclass: None,
            members: Members::Reflected {
                fields: vec![],
                methods: vec![],
                constructors: vec![],
            },
        }
    }

    /// Spec named after a serde-derived struct, with one mutable field per
    /// struct field.
    pub fn reflect<T: DeserializeOwned>(package: &str) -> Result<Self, Error> {
        let shape = Shape::of::<T>()?;
        let mut spec = Self::new(shape.name(), package);
        for field in shape.fields() {
            spec = spec.field(field, true);
        }
        Ok(spec)
    }

    /// Spec whose patterns are given verbatim.
    pub fn declared<S: Into<String>, P: Into<String>>(
        name: S,
        package: P,
        surface: Vec<SurfaceEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            superclass: None,
            members: Members::Declared(surface),
        }
    }

    pub fn extends<S: Into<String>>(mut self, superclass: S) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn field(mut self, name: &str, mutable: bool) -> Self {
        if let Members::Reflected { fields, .. } = &mut self.members {
            fields.push(FieldSpec {
                name: name.to_string(),
                mutable,
            });
        }
        self
    }

    pub fn method(self, name: &str, params: &[&str], native: NativeFn) -> Self {
        self.push_method(name, params, false, Some(native))
    }

    pub fn static_method(self, name: &str, params: &[&str], native: NativeFn) -> Self {
        self.push_method(name, params, true, Some(native))
    }

    pub fn abstract_method(self, name: &str, params: &[&str]) -> Self {
        self.push_method(name, params, false, None)
    }

    pub fn constructor(mut self, params: &[&str], native: NativeFn) -> Self {
        if let Members::Reflected { constructors, .. } = &mut self.members {
            constructors.push(ConstructorSpec {
                params: params.iter().map(|p| p.to_string()).collect(),
                native,
            });
        }
        self
    }

    fn push_method(
        mut self,
        name: &str,
        params: &[&str],
        is_static: bool,
        native: Option<NativeFn>,
    ) -> Self {
        if let Members::Reflected { methods, .. } = &mut self.members {
            methods.push(MethodSpec {
                name: name.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
                is_static,
                native,
            });
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Pattern -> Attribute bindings a generator at `level` gets for this
    /// class. Inherited members are not included.
    pub fn attributes(&self, level: Level) -> Vec<(Pattern, Attribute)> {
        let mut attributes = vec![];
        for (entry_level, pattern, binding) in self.bindings() {
            if entry_level != level {
                continue;
            }
            let native = || NativeRef::new(&self.name, level, pattern.to_string());
            let attribute = match binding {
                Binding::Method(_) => Attribute::PrimMethod(native()),
                Binding::Function(_) => Attribute::PrimFunction(native()),
                Binding::Constructor(_) => Attribute::PrimCloning(native()),
                Binding::Reifier(name) => Attribute::PrimReifierMethod(name.to_string()),
            };
            attributes.push((pattern, attribute));
        }

        if level == Level::Instance {
            if let Members::Reflected { fields, .. } = &self.members {
                for field in fields {
                    let read = Pattern::unary(&field.name);
                    if field.mutable {
                        if let Some(write) = read.writer() {
                            let slot = Slot::Field(field.name.clone());
                            attributes.push((write, Attribute::VarSet(slot)));
                        }
                    }
                    let slot = Slot::Field(field.name.clone());
                    attributes.push((read, Attribute::VarGet(slot)));
                }
            }
        }
        attributes
    }

    /// Native behind `selector` at `level`.
    pub fn native(&self, level: Level, selector: &str) -> Option<NativeFn> {
        self.bindings()
            .into_iter()
            .find(|(l, pattern, _)| *l == level && pattern.to_string() == selector)
            .and_then(|(_, _, binding)| match binding {
                Binding::Method(f) | Binding::Function(f) | Binding::Constructor(f) => Some(f),
                Binding::Reifier(_) => None,
            })
    }

    fn bindings(&self) -> Vec<(Level, Pattern, Binding)> {
        match &self.members {
            Members::Declared(surface) => surface
                .iter()
                .map(|e| (e.level, e.pattern.clone(), e.binding.clone()))
                .collect(),
            Members::Reflected {
                methods,
                constructors,
                ..
            } => {
                let mut bindings = vec![];
                for method in methods {
                    let native = match method.native {
                        Some(native) => native,
                        None => continue,
                    };
                    let pattern = method_pattern(&method.name, &method.params);
                    if method.is_static {
                        bindings.push((Level::Class, pattern, Binding::Function(native)));
                    } else {
                        bindings.push((Level::Instance, pattern, Binding::Method(native)));
                    }
                }
                for constructor in constructors {
                    bindings.push((
                        Level::Class,
                        constructor_pattern(&constructor.params),
                        Binding::Constructor(constructor.native),
                    ));
                }
                bindings
            }
        }
    }
}

impl SurfaceEntry {
    pub fn new(level: Level, pattern: Pattern, binding: Binding) -> Self {
        Self {
            level,
            pattern,
            binding,
        }
    }
}


impl ClassRegistry {
    /// Registry holding only the built-in wrapper types.
    pub fn new() -> Self {
        let mut registry = Self::default();
        for spec in super::wrappers::wrapper_specs() {
            registry.register(spec);
        }
        registry
    }

    /// Adds or replaces a class.
    pub fn register(&mut self, spec: ClassSpec) {
        self.classes.insert(spec.name.clone(), spec);
    }

    pub fn with(mut self, spec: ClassSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn get(&self, name: &str) -> Result<&ClassSpec, Error> {
        self.classes
            .get(name)
            .ok_or_else(|| Error::prim("reflect", format!("Unregistered class {}", name)))
    }

    pub fn native(&self, native: &NativeRef) -> Result<NativeFn, Error> {
        self.get(native.class())?
            .native(native.level(), native.selector())
            .ok_or_else(|| Error::prim("reflect", format!("No native bound for {}", native)))
    }

    /// Classes declared directly in `package`.
    pub fn classes_in<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a ClassSpec> {
        self.classes.values().filter(move |c| c.package == package)
    }

    /// Direct sub-packages of `package`, as full paths.
    pub fn subpackages(&self, package: &str) -> Vec<String> {
        let mut subpackages = self
            .classes
            .values()
            .filter_map(|c| child_package(package, &c.package))
            .collect::<Vec<_>>();
        subpackages.sort();
        subpackages.dedup();
        subpackages
    }
}

/// Full path of the child of `parent` on the way to `descendant`.
fn child_package(parent: &str, descendant: &str) -> Option<String> {
    let rest = if parent.is_empty() {
        descendant
    } else {
        descendant.strip_prefix(parent)?.strip_prefix('.')?
    };
    let segment = rest.split('.').next().filter(|s| !s.is_empty())?;
    if parent.is_empty() {
        Some(segment.to_string())
    } else {
        Some(format!("{}.{}", parent, segment))
    }
}

/// Last segment of a package path.
pub fn package_leaf(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}


// Natives print by shape only.
impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))?;
        if self.is_static {
            write!(f, " static")?;
        }
        if self.native.is_none() {
            write!(f, " abstract")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConstructorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new({})", self.params.join(", "))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Method(_) => write!(f, "Method"),
            Binding::Function(_) => write!(f, "Function"),
            Binding::Constructor(_) => write!(f, "Constructor"),
            Binding::Reifier(name) => write!(f, "Reifier({})", name),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Instance => Ok(()),
            Level::Class => write!(f, " class"),
            Level::Package => write!(f, " package"),
        }
    }
}


#[cfg(test)]
#[path = "./class_test.rs"]
mod class_test;
