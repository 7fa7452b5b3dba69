// HTTP routes
pub mod health;
pub mod trigger;

pub use health::*;
pub use trigger::*;
