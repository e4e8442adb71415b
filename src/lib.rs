pub mod api;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod dksh;
pub mod frontend;
pub mod span;
pub mod stage;
pub mod varying;

pub use config::target;

pub use api::*;
pub use stage::Stage;
