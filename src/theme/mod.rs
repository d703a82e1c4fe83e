//! Shared UI theme: color palette and text widget constructors.

pub mod palette;
pub mod widget;
