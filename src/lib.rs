pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod relay;
pub mod server;
pub mod translate;

pub use config::GatewayConfig;
pub use dispatch::Dispatcher;
pub use error::{GatewayError, Result};
pub use server::{build_router, AppState};
