//! CSV dataset loading for the recommenders.

pub mod loader;

pub use loader::DatasetLoader;
