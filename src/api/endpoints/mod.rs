//! API endpoint handlers, one module per route group.

pub mod analyze;
pub mod freecad;
pub mod health;
pub mod standards;
pub mod tolerances;
