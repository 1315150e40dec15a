//! Wizard chat engine core.
//!
//! Everything here is platform-free: browser adapters implement the traits
//! in [`ports`] and the app crate wires them into a [`runtime::ChatRuntime`].

pub mod ports;
pub mod event_bus;
pub mod decoder;
pub mod render;
pub mod images;
pub mod store;
pub mod session;
pub mod runtime;
