pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod poller;
pub mod sources;
pub mod state;
pub mod view;

pub use error::{ConfigError, FetchError, LayoutError, ShapeError};
pub use poller::{PollerHandle, StatePoller};
pub use sources::{HttpStateSource, StateSource};
pub use state::{normalize, ClusterState, StateCell};
