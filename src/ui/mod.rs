//! Live terminal progress
//!
//! - [`layout`] - width-tiered composition of one status row
//! - [`format`] - status texts (progress, warnings, failures)
//! - [`terminal`] - output backends behind [`TerminalRenderer`]
//! - [`renderer`] - the periodic redraw task and its suspend/resume control

pub mod format;
pub mod layout;
pub mod renderer;
pub mod terminal;

pub use layout::{DEFAULT_WIDTH, compose_line, plain_line};
pub use renderer::{ProgressRenderer, RenderControl, RendererHandle};
pub use terminal::{AnsiTerminal, BufferTerminal, NullTerminal, TerminalRenderer};
