pub mod entity;
pub mod series;
pub mod time;

pub use entity::*;
pub use series::*;
pub use time::*;
