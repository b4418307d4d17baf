pub mod action;
pub mod assignment;
pub mod catalog;
pub mod day;
pub mod death;
pub mod error;
pub mod night;
pub mod player;

pub use action::*;
pub use assignment::*;
pub use catalog::*;
pub use error::*;
pub use player::*;
