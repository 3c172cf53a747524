pub mod renderer;
pub mod strategy;
pub mod work;

pub use renderer::*;
pub use strategy::*;
pub use work::*;
