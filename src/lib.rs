use log::info;
use std::path::PathBuf;

use crate::bridge::ClassRegistry;
use crate::error::Error;
use crate::universe::Universe;


#[macro_use]
pub mod error;

pub mod bridge;
pub mod continuation;
pub mod image;
pub mod model;
pub mod pattern;
pub mod reifiers;
pub mod syntax;
pub mod universe;

pub mod prelude {
    pub use crate::bridge::{ClassRegistry, ClassSpec, HostValue, Instances, Level};
    pub use crate::error::{Error, ErrorKind, ExceptionRecord};
    pub use crate::image::Image;
    pub use crate::model::{AgoraObject, Attribute, Category, Context};
    pub use crate::pattern::{Pattern, PatternKind};
    pub use crate::syntax::{parse, Expression};
    pub use crate::universe::Universe;
    pub use crate::InitOptions;
    // Macros.
    pub use crate::{err, err_nost, surface};
}


/// Method of starting up Agora.
///
/// Fresh bootstraps a new universe. Image resumes from a saved image file,
/// falling back to a fresh universe when the file does not exist yet.
pub enum InitOptions {
    Fresh,
    Image(PathBuf),
}

/// Builds the Universe every evaluation runs in.
///
/// Note that this function does *not* setup logging, clients should
/// take care of that prior to calling this function. See:
///   https://github.com/rust-lang/log#in-executables.
pub fn init(options: InitOptions, registry: ClassRegistry) -> Result<Universe, Error> {
    match options {
        InitOptions::Fresh => Universe::new(registry),
        InitOptions::Image(path) => {
            if path.exists() {
                Universe::load_image_file(&path, registry)
            } else {
                info!("No image at {}; starting fresh.", path.display());
                Universe::new(registry)
            }
        }
    }
}
