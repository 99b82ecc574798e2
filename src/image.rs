//! Whole-universe persistence.
//!
//! An Image is exactly the global root structures plus the bridge cache.
//! The class registry is code rather than state, so it is supplied again
//! when an image is loaded.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::bridge::{Bridge, ClassRegistry};
use crate::error::Error;
use crate::universe::{Globals, Universe};


#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Image {
    globals: Globals,
    bridge: Bridge,
}


impl Image {
    pub fn of(universe: &Universe) -> Self {
        Self {
            globals: universe.globals().clone(),
            bridge: universe.bridge().clone(),
        }
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Replaces globals and bridge together by building a new Universe.
    pub fn into_universe(self, registry: ClassRegistry) -> Universe {
        Universe::from_parts(self.globals, self.bridge, registry)
    }
}


impl Universe {
    pub fn save_image(&self) -> Result<Vec<u8>, Error> {
        Image::of(self).to_bytes()
    }

    pub fn load_image(bytes: &[u8], registry: ClassRegistry) -> Result<Universe, Error> {
        Ok(Image::from_bytes(bytes)?.into_universe(registry))
    }

    pub fn save_image_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let bytes = self.save_image()?;
        fs::write(path.as_ref(), bytes)?;
        info!("Saved image to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_image_file<P: AsRef<Path>>(
        path: P,
        registry: ClassRegistry,
    ) -> Result<Universe, Error> {
        let bytes = fs::read(path.as_ref())?;
        let universe = Self::load_image(&bytes, registry)?;
        info!("Loaded image from {}", path.as_ref().display());
        Ok(universe)
    }
}
