//! Stack of in-flight sends, kept by the Universe for diagnostics.

use log::warn;

use std::fmt;

use crate::model::GeneratorId;
use crate::pattern::Pattern;


#[derive(Clone, Debug, PartialEq)]
pub struct Continuation<Frame>(Vec<Frame>);

/// One dispatch in progress. The root frame (no pattern) is the toplevel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendFrame {
    pattern: Option<Pattern>,
    holder: Option<GeneratorId>,
}

pub type SendCont = Continuation<SendFrame>;


impl<Frame> Continuation<Frame> {
    pub fn new(root: Frame) -> Self {
        Self(vec![root])
    }

    pub fn top(&self) -> &Frame {
        let len = self.depth();
        &self.0[len - 1]
    }

    pub fn push(&mut self, frame: Frame) {
        self.0.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        if self.depth() == 1 {
            warn!("Ignoring pop of toplevel send frame");
            return None;
        }
        self.0.pop()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Iterator from most-recent to least-recent frame.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.0.iter().rev()
    }
}

impl<Frame: Default> Default for Continuation<Frame> {
    fn default() -> Self {
        Self::new(Frame::default())
    }
}

impl SendFrame {
    pub fn new(pattern: Pattern, holder: GeneratorId) -> Self {
        Self {
            pattern: Some(pattern),
            holder: Some(holder),
        }
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub fn holder(&self) -> Option<GeneratorId> {
        self.holder
    }
}


impl fmt::Display for SendFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.pattern, self.holder) {
            (Some(pattern), Some(holder)) => write!(f, "{} @ {}", pattern, holder),
            _ => write!(f, "<toplevel>"),
        }
    }
}

impl fmt::Display for SendCont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Sends depth {}]", self.depth())?;
        for frame in self.iter() {
            write!(f, "\n  {}", frame)?;
        }
        Ok(())
    }
}
