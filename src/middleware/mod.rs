pub mod auth_extractor;
pub mod tracing_layer;

pub use auth_extractor::{extract_bearer_token, CurrentUser};
pub use tracing_layer::init_tracing;
