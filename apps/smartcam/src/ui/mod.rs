//! Terminal presentation: view-state rendering and line input.

pub mod terminal;
pub mod view;
