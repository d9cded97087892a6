pub mod ai;
pub mod config;
mod ctx;
mod error;
mod routes;
pub mod standalone;

pub use ctx::Ctx;
pub use error::ApiError;
pub use routes::{get_routes, CaptionResponse, CaptionResult};

pub mod exports {
    pub use crate::standalone;
}
