use std::{future::Future, sync::Arc};

use cynic::{MutationBuilder, QueryBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{FeaturedUpdate, Speaker, SpeakerId},
    protocol::{
        GraphQLRequest, MarkFeaturedVariables, SpeakerByIdQuery, SpeakerByIdVariables,
        SpeakersQuery, ToggleFeaturedSpeaker,
    },
};
use tokio::sync::{broadcast, broadcast::error::RecvError, mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

pub mod cache;
pub mod error;
pub mod query;
pub mod transport;

pub use cache::EntityStore;
pub use error::ClientError;
pub use query::QueryState;
pub use transport::{
    GraphQLTransport, HttpTransport, HttpTransportOptions, DEFAULT_GRAPHQL_URL,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const WATCH_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    #[default]
    CacheFirst,
    NetworkOnly,
    CacheOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    CacheUpdated { ids: Vec<SpeakerId> },
    SpeakerUpdated(FeaturedUpdate),
    /// The whole store was dropped; watchers re-run their queries.
    CacheReset,
}

impl ClientEvent {
    pub fn touches(&self, id: &SpeakerId) -> bool {
        match self {
            ClientEvent::CacheUpdated { ids } => ids.contains(id),
            ClientEvent::SpeakerUpdated(update) => &update.id == id,
            ClientEvent::CacheReset => true,
        }
    }
}

pub struct ConferenceClient {
    transport: Arc<dyn GraphQLTransport>,
    cache: RwLock<EntityStore>,
    events: broadcast::Sender<ClientEvent>,
}

impl ConferenceClient {
    pub fn new(endpoint: &str) -> Result<Arc<Self>, ClientError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(endpoint)?)))
    }

    pub fn with_transport(transport: Arc<dyn GraphQLTransport>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            transport,
            cache: RwLock::new(EntityStore::new()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Sends one operation and decodes its typed data.
    ///
    /// Any entry in `errors` fails the whole operation, even when partial
    /// data came back alongside it.
    pub async fn execute<Q, V>(&self, operation: cynic::Operation<Q, V>) -> Result<Q, ClientError>
    where
        Q: DeserializeOwned,
        V: Serialize,
    {
        let request = GraphQLRequest::from_operation(&operation)?;
        let name = request
            .operation_name
            .clone()
            .unwrap_or_else(|| "anonymous".to_string());
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(operation = %name, error = %err, "graphql transport failed");
                return Err(err);
            }
        };

        if !response.errors.is_empty() {
            warn!(
                operation = %name,
                errors = response.errors.len(),
                "graphql operation returned errors"
            );
            return Err(ClientError::GraphQL(response.errors));
        }

        match response.data {
            None | Some(Value::Null) => Err(ClientError::MissingData { operation: name }),
            Some(data) => Ok(serde_json::from_value(data)?),
        }
    }

    pub async fn speakers(&self, policy: FetchPolicy) -> Result<Vec<Speaker>, ClientError> {
        if policy != FetchPolicy::NetworkOnly {
            if let Some(cached) = self.cache.read().await.read_speakers() {
                debug!(count = cached.len(), "speakers served from cache");
                return Ok(cached);
            }
            if policy == FetchPolicy::CacheOnly {
                return Err(ClientError::CacheMiss {
                    operation: "speakers",
                });
            }
        }

        let data = self.execute(SpeakersQuery::build(())).await?;
        let fetched: Vec<Speaker> = data.speakers.into_iter().map(Speaker::from).collect();
        let ids: Vec<SpeakerId> = fetched.iter().map(|s| s.id.clone()).collect();
        let speakers = {
            let mut cache = self.cache.write().await;
            cache.write_speakers(fetched);
            cache.read_speakers().unwrap_or_default()
        };
        info!(count = speakers.len(), "cached speakers");
        let _ = self.events.send(ClientEvent::CacheUpdated { ids });
        Ok(speakers)
    }

    pub async fn speaker(
        &self,
        id: &SpeakerId,
        policy: FetchPolicy,
    ) -> Result<Speaker, ClientError> {
        if policy != FetchPolicy::NetworkOnly {
            {
                let cache = self.cache.read().await;
                if cache.has_speaker_query(id) {
                    if let Some(cached) = cache.read_speaker(id) {
                        debug!(speaker_id = %id, "speaker served from cache");
                        return Ok(cached);
                    }
                }
            }
            if policy == FetchPolicy::CacheOnly {
                return Err(ClientError::CacheMiss {
                    operation: "speaker",
                });
            }
        }

        let data = self
            .execute(SpeakerByIdQuery::build(SpeakerByIdVariables::new(id)))
            .await?;
        let speaker = data
            .speaker_by_id
            .map(Speaker::from)
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;

        let speaker_id = speaker.id.clone();
        self.cache.write().await.write_speaker(speaker.clone());
        info!(speaker_id = %speaker_id, "cached speaker");
        let _ = self.events.send(ClientEvent::CacheUpdated {
            ids: vec![speaker_id],
        });
        Ok(speaker)
    }

    /// Sets the featured flag and merges the returned `{id, featured}` pair
    /// into every cached copy of that speaker.
    pub async fn mark_featured(
        &self,
        speaker_id: &SpeakerId,
        featured: bool,
    ) -> Result<FeaturedUpdate, ClientError> {
        let data = self
            .execute(ToggleFeaturedSpeaker::build(MarkFeaturedVariables::new(
                speaker_id, featured,
            )))
            .await?;
        let update = FeaturedUpdate::from(data.mark_featured);

        let changed = self.cache.write().await.merge_featured(&update);
        info!(
            speaker_id = %update.id,
            featured = update.featured,
            changed,
            "merged featured flag"
        );
        if changed {
            let _ = self.events.send(ClientEvent::SpeakerUpdated(update.clone()));
        }
        Ok(update)
    }

    pub async fn query_speakers(&self, policy: FetchPolicy) -> QueryState<Vec<Speaker>> {
        self.speakers(policy).await.into()
    }

    pub async fn query_speaker(&self, id: &SpeakerId, policy: FetchPolicy) -> QueryState<Speaker> {
        self.speaker(id, policy).await.into()
    }

    pub async fn cached_speakers(&self) -> Option<Vec<Speaker>> {
        self.cache.read().await.read_speakers()
    }

    pub async fn cached_speaker(&self, id: &SpeakerId) -> Option<Speaker> {
        self.cache.read().await.read_speaker(id)
    }

    pub async fn evict(&self, id: &SpeakerId) -> bool {
        let removed = self.cache.write().await.evict(id).is_some();
        if removed {
            let _ = self.events.send(ClientEvent::CacheUpdated {
                ids: vec![id.clone()],
            });
        }
        removed
    }

    /// Drops every cached speaker. Live watchers go back to `Loading` and
    /// re-run their queries.
    pub async fn reset_cache(&self) {
        let dropped = {
            let mut cache = self.cache.write().await;
            let dropped = cache.len();
            cache.clear();
            dropped
        };
        info!(dropped, "cache reset");
        let _ = self.events.send(ClientEvent::CacheReset);
    }

    /// Streams `Loading`, the query result, then a fresh `Ready` from the
    /// store after every cache change. Only a cache reset sends the query
    /// to the network again.
    pub fn watch_speakers(
        self: &Arc<Self>,
        policy: FetchPolicy,
    ) -> ReceiverStream<QueryState<Vec<Speaker>>> {
        self.spawn_watcher(
            move |client| async move { client.query_speakers(policy).await },
            |store| store.read_speakers(),
            |_| true,
        )
    }

    pub fn watch_speaker(
        self: &Arc<Self>,
        id: SpeakerId,
        policy: FetchPolicy,
    ) -> ReceiverStream<QueryState<Speaker>> {
        let query_id = id.clone();
        let read_id = id.clone();
        self.spawn_watcher(
            move |client| {
                let id = query_id.clone();
                async move { client.query_speaker(&id, policy).await }
            },
            move |store| store.read_speaker(&read_id),
            move |event| event.touches(&id),
        )
    }

    fn spawn_watcher<T, Q, Fut, R, F>(
        self: &Arc<Self>,
        initial: Q,
        read: R,
        relevant: F,
    ) -> ReceiverStream<QueryState<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        Q: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = QueryState<T>> + Send + 'static,
        R: Fn(&EntityStore) -> Option<T> + Send + Sync + 'static,
        F: Fn(&ClientEvent) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let mut events = self.events.subscribe();
        let client = Arc::clone(self);

        tokio::spawn(async move {
            if tx.send(QueryState::Loading).await.is_err() {
                return;
            }
            let first = initial(Arc::clone(&client)).await;
            let mut last = first.data().cloned();
            if tx.send(first).await.is_err() {
                return;
            }

            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(ClientEvent::CacheReset) => {
                        if tx.send(QueryState::Loading).await.is_err() {
                            break;
                        }
                        let refetched = initial(Arc::clone(&client)).await;
                        last = refetched.data().cloned();
                        if tx.send(refetched).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(event) if !relevant(&event) => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "watcher lagged behind cache events");
                    }
                    Err(RecvError::Closed) => break,
                }

                let Some(current) = read(&*client.cache.read().await) else {
                    continue;
                };
                if last.as_ref() == Some(&current) {
                    continue;
                }
                last = Some(current.clone());
                if tx.send(QueryState::Ready(current)).await.is_err() {
                    break;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
