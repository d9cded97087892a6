mod image_caption;

use crate::{loader, HandlerPayload};
use futures::Future;
pub use image_caption::*;
use std::fmt::Debug;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub trait Model {
    type Item;
    type Output;

    fn process(
        &mut self,
        items: Vec<Self::Item>,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<anyhow::Result<Self::Output>>>> + Send;

    fn batch_size_limit(&self) -> usize;
}

pub type BatchHandlerTx<Item, Output> = mpsc::Sender<HandlerPayload<Item, Output>>;

/// Handle to a model running on its own worker thread.
///
/// The model is created on the first request and kept. When an offload duration
/// is given, it is dropped after being idle that long and created again on the
/// next request.
#[derive(Debug)]
pub struct AIModel<TItem, TOutput> {
    model_id: String, // for better logging
    tx: BatchHandlerTx<TItem, TOutput>,
}

impl<TItem, TOutput> Clone for AIModel<TItem, TOutput> {
    fn clone(&self) -> Self {
        Self {
            model_id: self.model_id.clone(),
            tx: self.tx.clone(),
        }
    }
}

async fn idle_timeout(offload_duration: Option<Duration>) {
    match offload_duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

impl<TItem, TOutput> AIModel<TItem, TOutput>
where
    TItem: Send + Sync + Clone + Debug + 'static,
    TOutput: Send + Sync + Debug + 'static,
{
    pub fn new<T, TFut, TFn>(
        model_id: impl Into<String>,
        create_model: TFn,
        offload_duration: Option<Duration>,
    ) -> anyhow::Result<Self>
    where
        T: Model<Item = TItem, Output = TOutput> + Send + 'static,
        TFut: Future<Output = anyhow::Result<T>> + Send + 'static,
        TFn: Fn() -> TFut + Send + 'static,
    {
        let model_id = model_id.into();
        let loader = loader::ModelLoader::new(move || {
            Box::pin(create_model()) as Pin<Box<dyn Future<Output = anyhow::Result<T>>>>
        });
        let (tx, mut rx) = mpsc::channel::<HandlerPayload<TItem, TOutput>>(512);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker_model_id = model_id.clone();
        std::thread::Builder::new()
            .name(format!("ai-model-{}", model_id))
            .spawn(move || {
                let local = tokio::task::LocalSet::new();

                local.spawn_local(async move {
                    loop {
                        tokio::select! {
                            _ = idle_timeout(offload_duration) => {
                                if loader.is_loaded().await {
                                    tracing::debug!(model_id = %worker_model_id, "No message received for {:?}, offload model", offload_duration);
                                    if let Err(e) = loader.offload().await {
                                        tracing::error!("failed to offload model: {}", e);
                                    }
                                }
                            }
                            payload = rx.recv() => {
                                match payload {
                                    Some((items, result_tx)) => {
                                        // If channel closed,
                                        // we have no way to response, just ignore task.
                                        // This is very useful for task cancellation.
                                        if result_tx.is_closed() {
                                            continue;
                                        }

                                        if let Err(e) = loader.load().await {
                                            tracing::error!(model_id = %worker_model_id, "failed to load model: {}", e);
                                            if result_tx.send(Err(e.context("failed to load model"))).is_err() {
                                                tracing::error!("failed to send results");
                                            }
                                            continue;
                                        }

                                        let mut model = loader.model.lock().await;
                                        let results = match model.as_mut() {
                                            Some(model) => {
                                                if items.len() > model.batch_size_limit() {
                                                    Err(anyhow::anyhow!(
                                                        "too many items: {} > {}",
                                                        items.len(),
                                                        model.batch_size_limit()
                                                    ))
                                                } else {
                                                    model.process(items).await
                                                }
                                            }
                                            None => {
                                                tracing::error!("no valid model");
                                                Err(anyhow::anyhow!("failed to load model"))
                                            }
                                        };

                                        if result_tx.send(results).is_err() {
                                            tracing::error!("failed to send results");
                                        }
                                    }
                                    _ => {
                                        // this means all tx has been dropped
                                        if loader.is_loaded().await {
                                            tracing::warn!("all tx dropped, offload model and end loop");
                                            if let Err(e) = loader.offload().await {
                                                tracing::error!("failed to offload model: {}", e);
                                            }
                                        }
                                        break;
                                    }
                                }
                            }
                        }
                    }
                });

                rt.block_on(local);
            })?;

        Ok(Self { model_id, tx })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[tracing::instrument(name = "AIModel::process", err(Debug), skip_all, fields(model_id=%self.model_id))]
    pub async fn process(&self, items: Vec<TItem>) -> anyhow::Result<Vec<anyhow::Result<TOutput>>> {
        let (result_tx, rx) = oneshot::channel();
        match self.tx.send((items, result_tx)).await {
            Ok(_) => {
                tracing::debug!("items sent to model");
            }
            Err(e) => {
                anyhow::bail!("failed to send items: {:?}", e);
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(e) => {
                anyhow::bail!("failed to receive results: {:?}", e);
            }
        }
    }

    #[tracing::instrument(name = "AIModel::process_single", err(Debug), skip_all, fields(model_id=%self.model_id))]
    pub async fn process_single(&self, item: TItem) -> anyhow::Result<TOutput> {
        let results = self.process(vec![item]).await?;
        let result = results
            .into_iter()
            .next()
            .ok_or(anyhow::anyhow!("no result"))??;
        Ok(result)
    }
}
