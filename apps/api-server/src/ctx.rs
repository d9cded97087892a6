use crate::{ai::AIHandler, config::ServerConfig};
use image_source::ImageAcquirer;
use std::sync::Arc;

/// Shared by every request. Cloning only clones references.
#[derive(Debug, Clone)]
pub struct Ctx {
    config: Arc<ServerConfig>,
    ai_handler: AIHandler,
    acquirer: ImageAcquirer,
}

impl Ctx {
    pub fn new(config: ServerConfig, ai_handler: AIHandler, acquirer: ImageAcquirer) -> Self {
        Self {
            config: Arc::new(config),
            ai_handler,
            acquirer,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn ai_handler(&self) -> &AIHandler {
        &self.ai_handler
    }

    pub fn acquirer(&self) -> &ImageAcquirer {
        &self.acquirer
    }
}
