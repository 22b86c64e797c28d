//! Overlay collaborator seam.
//!
//! The break scheduler only ever opens, retitles and closes surfaces; how a
//! surface is drawn is up to the `Screens` implementation behind it.

pub mod notification;

use crate::displays::Display;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not open overlay on {display}: {reason}")]
pub struct OverlayError {
    pub display: String,
    pub reason: String,
}

/// A full-screen, always-on-top surface showing a line of text.
pub trait Surface {
    fn set_text(&mut self, text: &str);
    fn close(self);
}

/// Source of displays and of the surfaces covering them.
pub trait Screens {
    type Surface: Surface;

    fn displays(&mut self) -> Vec<Display>;

    fn open(&mut self, display: &Display, text: &str) -> Result<Self::Surface, OverlayError>;
}
