//! Constraint solver for 2D sketches.
//!
//! Geometry and constraints live in a [`Sketch`]; this crate resolves them
//! into parameter-level residuals and drives those residuals to zero with
//! damped gradient descent. Runs are resumable so a UI can animate a solve
//! one batch of iterations at a time.

pub mod builder;
pub mod codec;
pub mod driver;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod measure;
pub mod solver;

pub use builder::{CircleParts, Rect, SegmentParts};
pub use driver::{DriverConfig, DriverState, FrameDriver, SolvingStats};
pub use error::{SolverError, StopReason};
pub use index::GeoIndex;
pub use sketch_types::*;
pub use solver::{SketchSolver, Snapshot, SolveConfig, SolveReport, SolveRun, StepStatus, ERROR_TOLERANCE};
