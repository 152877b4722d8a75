//! Data models for Foresight

mod series;
mod forecast;
mod plan;
mod alert;

pub use series::*;
pub use forecast::*;
pub use plan::*;
pub use alert::*;
