#![allow(missing_docs)]
pub mod network_context;
pub mod placeholder_context;

pub use network_context::{head_transform_frame, HeadTransformSink};
pub use placeholder_context::{PlaceholderRenderer, ScenePlaceholders};
