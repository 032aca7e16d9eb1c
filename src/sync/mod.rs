//! Label persistence: the service seam, its backends and the debounced gateway.

mod debounce;
mod gateway;
mod service;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod http;

pub use debounce::Debouncer;
pub use gateway::{GatewayEvent, PersistenceGateway};
pub use service::{Completion, LabelService, MemoryLabelService, SaveLabelRequest};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileLabelService;
#[cfg(target_arch = "wasm32")]
pub use http::HttpLabelService;
