use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::Launchpad;
use crate::error::StoreError;
use crate::rest_client::BackingStore;

type LoadResult = Result<Option<Launchpad>, StoreError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Request-scoped batching and deduplication for launchpad lookups.
///
/// `load` never talks to the store directly. Each new identifier gets an
/// unsettled slot and joins the current batching window; the first
/// registration in a window schedules a flush that runs once the current
/// cooperative turn has yielded, so every lookup issued by the same resolver
/// pass lands in one `query_launchpads` call. Slots double as a per-request
/// memo: loading an identifier that has already been requested returns the
/// pending or completed result of the first request.
pub struct LaunchpadLoader {
    store: Arc<dyn BackingStore>,
    state: Arc<Mutex<LoaderState>>,
}

#[derive(Default)]
struct LoaderState {
    slots: HashMap<String, SharedLoad>,
    senders: HashMap<String, oneshot::Sender<LoadResult>>,
    queue: Vec<String>,
    flush_scheduled: bool,
}

impl LaunchpadLoader {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        LaunchpadLoader {
            store,
            state: Arc::new(Mutex::new(LoaderState::default())),
        }
    }

    /// Resolve one launchpad by id through the current batching window.
    /// Every call settles: with the record, with `None` when the store has
    /// no match, or with the window's shared error.
    pub async fn load(&self, id: &str) -> LoadResult {
        let slot = {
            let mut state = self.state.lock().await;
            match state.slots.get(id) {
                Some(existing) => existing.clone(),
                None => {
                    let (tx, rx) = oneshot::channel::<LoadResult>();
                    let shared: SharedLoad = async move {
                        match rx.await {
                            Ok(outcome) => outcome,
                            Err(_) => Err(StoreError::BatchDropped),
                        }
                    }
                    .boxed()
                    .shared();

                    state.slots.insert(id.to_string(), shared.clone());
                    state.senders.insert(id.to_string(), tx);
                    state.queue.push(id.to_string());

                    if !state.flush_scheduled {
                        state.flush_scheduled = true;
                        tokio::spawn(flush_window(
                            Arc::clone(&self.state),
                            Arc::clone(&self.store),
                        ));
                    }
                    shared
                }
            }
        };
        slot.await
    }
}

/// Drain one batching window into a single store call and distribute the
/// results back to every slot registered in it.
async fn flush_window(state: Arc<Mutex<LoaderState>>, store: Arc<dyn BackingStore>) {
    // Let the resolver pass that opened this window finish registering its
    // lookups before the queue is taken.
    tokio::task::yield_now().await;

    let (ids, senders) = {
        let mut state = state.lock().await;
        state.flush_scheduled = false;
        let ids = std::mem::take(&mut state.queue);
        let senders: Vec<(String, oneshot::Sender<LoadResult>)> = ids
            .iter()
            .filter_map(|id| state.senders.remove(id).map(|tx| (id.clone(), tx)))
            .collect();
        (ids, senders)
    };

    // An empty window never reaches the store.
    if ids.is_empty() {
        return;
    }
    debug!(count = ids.len(), "flushing batched launchpad lookup");

    match store.query_launchpads(&ids).await {
        Ok(records) => {
            let by_id: HashMap<&str, &Launchpad> =
                records.iter().map(|pad| (pad.id.as_str(), pad)).collect();
            for (id, tx) in senders {
                let outcome = by_id.get(id.as_str()).map(|pad| (*pad).clone());
                let _ = tx.send(Ok(outcome));
            }
        }
        Err(err) => {
            // The window shares one underlying call, so every slot in it
            // shares this failure.
            for (_, tx) in senders {
                let _ = tx.send(Err(err.clone()));
            }
        }
    }
}
