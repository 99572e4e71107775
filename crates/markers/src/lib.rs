pub mod cluster;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod factory;
pub mod headless;
pub mod marker;
pub mod observer;
pub mod overlay;
pub mod registry;
pub mod strategies;
pub mod style;
pub mod surface;
pub mod visibility;

pub use cluster::*;
pub use config::*;
pub use engine::*;
pub use entity::*;
pub use error::*;
pub use factory::*;
pub use headless::*;
pub use marker::*;
pub use observer::*;
pub use overlay::*;
pub use registry::*;
pub use strategies::*;
pub use style::*;
pub use surface::*;
pub use visibility::*;
