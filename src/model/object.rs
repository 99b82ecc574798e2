use std::fmt;

use serde::{Deserialize, Serialize};

use super::generator::GeneratorId;
use crate::bridge::HostValue;
use crate::error::{Error, ErrorKind};


/// An Agora identity: the generator that answers its messages, plus the
/// host value it stands for when it came through the bridge.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AgoraObject {
    generator: GeneratorId,
    payload: Option<HostValue>,
}


impl AgoraObject {
    pub fn new(generator: GeneratorId) -> Self {
        Self {
            generator,
            payload: None,
        }
    }

    pub fn wrapping(generator: GeneratorId, payload: HostValue) -> Self {
        Self {
            generator,
            payload: Some(payload),
        }
    }

    pub fn generator(&self) -> GeneratorId {
        self.generator
    }

    pub fn payload(&self) -> Option<&HostValue> {
        self.payload.as_ref()
    }

    pub fn with_payload(&self, payload: HostValue) -> Self {
        Self::wrapping(self.generator, payload)
    }

    /// Host value of this object.
    pub fn down(&self) -> Result<HostValue, Error> {
        match &self.payload {
            Some(value) => Ok(value.clone()),
            None => err_nost!(ErrorKind::ProgramError(
                format!("{} has no host value", self).into()
            )),
        }
    }
}


impl fmt::Display for AgoraObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(value) => write!(f, "<{} {}>", value, self.generator),
            None => write!(f, "<object {}>", self.generator),
        }
    }
}
