//! Chat session: controller, its event loop, reply reveal and prompt commands

pub mod commands;
pub mod controller;
pub mod reveal;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ChatController, ChatSnapshot, ControllerContext, Phase, ViewChannels};
pub use reveal::{RevealEngine, RevealHandle, RevealStream, RevealUpdate};
pub use runtime::{ControllerHandle, ControllerRuntime};
