//! Data models for the selection core

mod building;
mod candidate;
mod operator;
mod unit;

pub use building::*;
pub use candidate::*;
pub use operator::*;
pub use unit::*;
