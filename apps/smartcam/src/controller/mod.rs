//! Controller layer: UI events, notification modeling, and command dispatch.

pub mod events;
pub mod orchestration;
