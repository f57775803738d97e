pub mod cleaner;
pub mod config;
pub mod entities;
pub mod generation;
pub mod pipeline;
