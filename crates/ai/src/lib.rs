#[cfg(feature = "accelerate")]
extern crate accelerate_src;

mod loader;
mod traits;

pub mod blip;

pub use traits::*;

use tokio::sync::oneshot;

pub type HandlerPayload<TItem, TOutput> = (
    Vec<TItem>,
    oneshot::Sender<anyhow::Result<Vec<anyhow::Result<TOutput>>>>,
);
