use super::loader::{Dataset, DatasetLoader, LoadError};
use super::sources::SourceFetcher;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Process-wide snapshot of the joined dataset.
///
/// The first caller runs the loader on the blocking pool and concurrent
/// callers wait on the same initialisation. A failed load is not stored, so
/// the next caller tries again. Nothing is ever refreshed after success.
pub struct DatasetCache<F> {
    loader: Arc<DatasetLoader<F>>,
    snapshot: OnceCell<Arc<Dataset>>,
}

impl<F> DatasetCache<F>
where
    F: SourceFetcher + 'static,
{
    pub fn new(loader: DatasetLoader<F>) -> Self {
        Self {
            loader: Arc::new(loader),
            snapshot: OnceCell::new(),
        }
    }

    /// A cache that starts out holding `dataset` and never fetches.
    pub fn preloaded(loader: DatasetLoader<F>, dataset: Dataset) -> Self {
        Self {
            loader: Arc::new(loader),
            snapshot: OnceCell::new_with(Some(Arc::new(dataset))),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.initialized()
    }

    pub async fn get_or_load(&self) -> Result<Arc<Dataset>, LoadError> {
        self.snapshot
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let dataset = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|err| LoadError::Interrupted(err.to_string()))?
                    .inspect_err(|err| error!(error = %err, "vacancy dataset unavailable"))?;
                info!(
                    listings = dataset.listings().len(),
                    "vacancy dataset cached for the process lifetime"
                );
                Ok::<_, LoadError>(Arc::new(dataset))
            })
            .await
            .cloned()
    }
}
