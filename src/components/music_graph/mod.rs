mod component;
pub mod interaction;
pub mod layout;
pub mod menu;
pub mod model;
mod render;
pub mod service;
pub mod state;
pub mod sync;
pub mod types;

pub use component::MusicGraphCanvas;
pub use interaction::HoverLink;
pub use model::{GraphModel, MergeOutcome};
pub use service::{DataService, ServiceError};
pub use state::MusicGraphState;
pub use types::{GraphDelta, Node, NodeDetails, Relation, WireNode};
