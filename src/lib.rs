pub mod config;
pub mod logging;
pub mod metrics;
pub mod render;
pub mod template;

pub use config::{IngressConfig, MainConfig};
pub use template::{render, ConfigPayload, TemplateError};
