//! Terminal front end: configuration, storage, effect loop and rendering.
mod app;
pub mod config;
mod effects;
mod persistence;
mod render;

pub use app::run;
