pub mod arc;
pub mod segment;
pub mod law;
pub mod tdcr;
pub mod ctcr;

pub use arc::{arc_step, discretize, CURVATURE_EPSILON};
pub use segment::{SegmentGeometry, TendonLayout};
pub use law::{BendingLaw, ConstantCurvatureLaw};
pub use tdcr::{TdcrConfig, TendonDrivenModel};
pub use ctcr::{ConcentricTubeModel, CtcrConfig, TubeGeometry};
