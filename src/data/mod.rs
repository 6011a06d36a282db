//! Data module - CSV loading and review records

mod loader;
mod processor;
mod record;

pub use loader::DataLoader;
pub use record::{Cell, Month, Review, ReviewTable};
