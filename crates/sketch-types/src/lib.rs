pub mod constraint;
pub mod geo;
pub mod ids;
pub mod param;
pub mod sketch;

pub use constraint::*;
pub use geo::*;
pub use ids::*;
pub use param::*;
pub use sketch::*;
