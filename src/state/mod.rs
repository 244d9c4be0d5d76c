pub mod cell;
pub mod model;
pub mod normalizer;

pub use cell::{CellStatus, StateCell, TickFailure};
pub use model::{ClusterState, HistogramEntry, ServerRecord, ServerStatus, VirtualNode};
pub use normalizer::{normalize, RawPayload};
