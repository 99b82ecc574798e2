//! Agora object model: attributes, generators, objects and contexts.

pub mod attribute;
pub mod context;
pub mod generator;
pub mod object;

pub use attribute::{Attribute, NativeRef, Slot, UserMethod};
pub use context::{Category, Client, Context, Handler};
pub use generator::{CellId, Generator, GeneratorId, Heap, Resolution, Table};
pub use object::AgoraObject;
