use super::*;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_graphql::{Context, EmptySubscription, Object, Schema, SimpleObject, ID};
use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use shared::{
    domain::{Session, SessionId},
    error::ErrorCode,
    protocol::{GraphQLError, GraphQLResponse},
};
use tokio::{net::TcpListener, sync::Mutex, time::timeout};
use tokio_stream::StreamExt;

#[derive(Clone, Default)]
struct Directory {
    speakers: Arc<Mutex<Vec<Speaker>>>,
    mutations: Arc<Mutex<Vec<(String, bool)>>>,
}

#[derive(SimpleObject, Clone)]
#[graphql(name = "Session")]
struct SessionObject {
    id: ID,
    title: String,
}

#[derive(SimpleObject, Clone)]
#[graphql(name = "Speaker")]
struct SpeakerObject {
    id: ID,
    name: String,
    bio: String,
    sessions: Vec<SessionObject>,
    featured: bool,
}

impl From<&Speaker> for SpeakerObject {
    fn from(speaker: &Speaker) -> Self {
        Self {
            id: ID::from(speaker.id.as_str()),
            name: speaker.name.clone(),
            bio: speaker.bio.clone(),
            sessions: speaker
                .sessions
                .iter()
                .map(|session| SessionObject {
                    id: ID::from(session.id.as_str()),
                    title: session.title.clone(),
                })
                .collect(),
            featured: speaker.featured,
        }
    }
}

struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn speakers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<SpeakerObject>> {
        let directory = ctx.data::<Directory>()?;
        Ok(directory
            .speakers
            .lock()
            .await
            .iter()
            .map(SpeakerObject::from)
            .collect())
    }

    async fn speaker_by_id(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<SpeakerObject>> {
        let directory = ctx.data::<Directory>()?;
        let speakers = directory.speakers.lock().await;
        match speakers.iter().find(|s| s.id.as_str() == id.as_str()) {
            Some(speaker) => Ok(Some(SpeakerObject::from(speaker))),
            None => Err(async_graphql::Error::new("speaker not found")),
        }
    }
}

struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn mark_featured(
        &self,
        ctx: &Context<'_>,
        speaker_id: ID,
        featured: bool,
    ) -> async_graphql::Result<SpeakerObject> {
        let directory = ctx.data::<Directory>()?;
        let mut speakers = directory.speakers.lock().await;
        let speaker = speakers
            .iter_mut()
            .find(|s| s.id.as_str() == speaker_id.as_str())
            .ok_or_else(|| async_graphql::Error::new("speaker not found"))?;
        speaker.featured = featured;
        directory
            .mutations
            .lock()
            .await
            .push((speaker_id.0.clone(), featured));
        Ok(SpeakerObject::from(&*speaker))
    }
}

type FakeSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(Clone)]
struct FakeServer {
    directory: Directory,
    schema: FakeSchema,
    requests: Arc<AtomicUsize>,
}

impl FakeServer {
    fn new(speakers: Vec<Speaker>) -> Self {
        let directory = Directory {
            speakers: Arc::new(Mutex::new(speakers)),
            ..Directory::default()
        };
        let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
            .data(directory.clone())
            .finish();
        Self {
            directory,
            schema,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn speaker(id: &str, featured: bool) -> Speaker {
    Speaker {
        id: SpeakerId::new(id),
        name: format!("Speaker {id}"),
        bio: format!("Bio {id}"),
        sessions: vec![Session {
            id: SessionId::new(format!("session-{id}")),
            title: format!("Talk {id}"),
        }],
        featured,
    }
}

async fn handle_graphql(
    State(state): State<FakeServer>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    Json(state.schema.execute(request).await)
}

async fn serve(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/graphql")
}

async fn spawn_graphql_server(state: FakeServer) -> String {
    serve(
        Router::new()
            .route("/graphql", post(handle_graphql))
            .with_state(state),
    )
    .await
}

/// Endpoint answering every request with a fixed status and body.
async fn spawn_raw_server(status: StatusCode, body: &'static str) -> String {
    serve(Router::new().route("/graphql", post(move || async move { (status, body) }))).await
}

async fn client_for(state: FakeServer) -> Arc<ConferenceClient> {
    let url = spawn_graphql_server(state).await;
    ConferenceClient::new(&url).expect("client")
}

struct CannedTransport {
    response: GraphQLResponse<Value>,
}

#[async_trait]
impl GraphQLTransport for CannedTransport {
    async fn execute(
        &self,
        _request: GraphQLRequest,
    ) -> Result<GraphQLResponse<Value>, ClientError> {
        Ok(self.response.clone())
    }
}

async fn next_state<T>(stream: &mut ReceiverStream<QueryState<T>>) -> QueryState<T> {
    timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("watcher produced a value in time")
        .expect("watcher stream open")
}

#[test]
fn rejects_non_http_endpoint() {
    let err = ConferenceClient::new("ftp://localhost/graphql")
        .err()
        .expect("must fail");
    assert!(matches!(err, ClientError::InvalidEndpoint(_)));
}

#[tokio::test]
async fn speakers_query_populates_cache_and_cache_first_skips_network() {
    let server = FakeServer::new(vec![speaker("1", false), speaker("2", true)]);
    let client = client_for(server.clone()).await;

    let first = client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");
    let second = client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn network_only_always_refetches() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server.clone()).await;

    client.speakers(FetchPolicy::NetworkOnly).await.expect("speakers");
    client.speakers(FetchPolicy::NetworkOnly).await.expect("speakers");

    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn cache_only_on_empty_store_is_a_cache_miss() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server.clone()).await;

    let err = client
        .speakers(FetchPolicy::CacheOnly)
        .await
        .expect_err("must miss");

    assert!(matches!(err, ClientError::CacheMiss { .. }));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn mark_featured_merges_into_cached_list_without_refetch() {
    let server = FakeServer::new(vec![speaker("1", false), speaker("2", false)]);
    let client = client_for(server.clone()).await;
    client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");

    let update = client
        .mark_featured(&SpeakerId::new("1"), true)
        .await
        .expect("mutation");

    assert!(update.featured);
    let cached = client.cached_speakers().await.expect("cached");
    assert!(cached[0].featured);
    assert!(!cached[1].featured);
    assert_eq!(server.request_count(), 2);
    assert_eq!(
        server.directory.mutations.lock().await.as_slice(),
        &[("1".to_string(), true)]
    );

    let served = client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");
    assert!(served[0].featured);
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn mark_featured_for_uncached_speaker_emits_no_event() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server).await;
    let mut events = client.subscribe_events();

    client
        .mark_featured(&SpeakerId::new("1"), true)
        .await
        .expect("mutation");

    assert!(client.cached_speaker(&SpeakerId::new("1")).await.is_none());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn speaker_detail_reuses_list_entity() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server.clone()).await;
    client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");

    let detail = client
        .speaker(&SpeakerId::new("1"), FetchPolicy::CacheFirst)
        .await
        .expect("speaker");

    assert_eq!(detail.name, "Speaker 1");
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn unknown_speaker_id_resolves_to_failed_state() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server).await;

    let state = client
        .query_speaker(&SpeakerId::new("404"), FetchPolicy::CacheFirst)
        .await;

    let error = state.error().expect("failed");
    assert_eq!(error.code, ErrorCode::Server);
    assert!(error.message.contains("speaker not found"));
}

#[tokio::test]
async fn null_speaker_without_errors_is_not_found() {
    let client = ConferenceClient::with_transport(Arc::new(CannedTransport {
        response: GraphQLResponse::ok(serde_json::json!({ "speakerById": null })),
    }));

    let err = client
        .speaker(&SpeakerId::new("9"), FetchPolicy::NetworkOnly)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::NotFound(id) if id.as_str() == "9"));
}

#[tokio::test]
async fn graphql_errors_win_over_partial_data() {
    let mut response = GraphQLResponse::ok(serde_json::json!({ "speakers": [] }));
    response.errors.push(GraphQLError::new("resolver exploded"));
    let client = ConferenceClient::with_transport(Arc::new(CannedTransport { response }));

    let state = client.query_speakers(FetchPolicy::NetworkOnly).await;

    assert_eq!(state.error().map(|e| e.code), Some(ErrorCode::Server));
    assert!(client.cached_speakers().await.is_none());
}

#[tokio::test]
async fn missing_data_is_a_decode_failure() {
    let client = ConferenceClient::with_transport(Arc::new(CannedTransport {
        response: GraphQLResponse::failed(Vec::new()),
    }));

    let state = client.query_speakers(FetchPolicy::NetworkOnly).await;

    assert_eq!(state.error().map(|e| e.code), Some(ErrorCode::Decode));
}

#[tokio::test]
async fn http_failure_resolves_to_failed_state() {
    let url = spawn_raw_server(StatusCode::INTERNAL_SERVER_ERROR, "{}").await;
    let client = ConferenceClient::new(&url).expect("client");

    let state = client.query_speakers(FetchPolicy::CacheFirst).await;

    let error = state.error().expect("failed");
    assert_eq!(error.code, ErrorCode::Server);
    assert!(error.message.contains("500"));
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_failure() {
    let url = spawn_raw_server(StatusCode::OK, "<html>oops</html>").await;
    let client = ConferenceClient::new(&url).expect("client");

    let state = client.query_speakers(FetchPolicy::NetworkOnly).await;

    assert_eq!(state.error().map(|e| e.code), Some(ErrorCode::Decode));
}

#[tokio::test]
async fn graphql_errors_in_bad_request_body_are_kept() {
    let url = spawn_raw_server(
        StatusCode::BAD_REQUEST,
        r#"{"errors":[{"message":"Cannot query field \"speakerByID\" on type \"Query\"."}]}"#,
    )
    .await;
    let client = ConferenceClient::new(&url).expect("client");

    let state = client.query_speakers(FetchPolicy::NetworkOnly).await;

    let error = state.error().expect("failed");
    assert_eq!(error.code, ErrorCode::Server);
    assert!(error.message.contains("speakerByID"));
}

#[tokio::test]
async fn bad_request_without_graphql_errors_keeps_status() {
    let url = spawn_raw_server(StatusCode::BAD_REQUEST, "bad request").await;
    let client = ConferenceClient::new(&url).expect("client");

    let err = client
        .speakers(FetchPolicy::NetworkOnly)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::Status { status: 400 }));
}

#[tokio::test]
async fn schema_rejects_documents_outside_the_speaker_type() {
    let url = spawn_graphql_server(FakeServer::new(vec![speaker("1", false)])).await;
    let transport = HttpTransport::new(&url).expect("transport");

    let response = transport
        .execute(GraphQLRequest {
            query: "query { speakerByID(id: \"1\") { id rating } }".to_string(),
            operation_name: None,
            variables: Value::Null,
        })
        .await
        .expect("response");

    assert!(!response.errors.is_empty());
    assert!(response.data.map_or(true, |data| data.is_null()));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = ConferenceClient::new(&format!("http://{addr}/graphql")).expect("client");

    let state = client.query_speakers(FetchPolicy::CacheFirst).await;

    assert_eq!(state.error().map(|e| e.code), Some(ErrorCode::Transport));
}

#[tokio::test]
async fn watch_speakers_rerenders_from_cache_after_mutation() {
    let server = FakeServer::new(vec![speaker("1", false), speaker("2", false)]);
    let client = client_for(server.clone()).await;
    let mut watch = client.watch_speakers(FetchPolicy::CacheFirst);

    assert!(next_state(&mut watch).await.is_loading());
    let ready = next_state(&mut watch).await;
    assert!(!ready.data().expect("ready")[0].featured);

    client
        .mark_featured(&SpeakerId::new("1"), true)
        .await
        .expect("mutation");

    let updated = next_state(&mut watch).await;
    assert!(updated.data().expect("ready")[0].featured);
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn watch_speaker_ignores_other_speakers() {
    let server = FakeServer::new(vec![speaker("1", false), speaker("2", false)]);
    let client = client_for(server).await;
    client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");
    let mut watch = client.watch_speaker(SpeakerId::new("1"), FetchPolicy::CacheFirst);

    assert!(next_state(&mut watch).await.is_loading());
    assert!(next_state(&mut watch).await.is_ready());

    client
        .mark_featured(&SpeakerId::new("2"), true)
        .await
        .expect("mutation");
    assert!(timeout(Duration::from_millis(200), watch.next()).await.is_err());

    client
        .mark_featured(&SpeakerId::new("1"), true)
        .await
        .expect("mutation");
    let updated = next_state(&mut watch).await;
    assert!(updated.data().expect("ready").featured);
}

#[tokio::test]
async fn evict_forces_next_cache_first_read_to_network() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server.clone()).await;
    client
        .speaker(&SpeakerId::new("1"), FetchPolicy::CacheFirst)
        .await
        .expect("speaker");

    assert!(client.evict(&SpeakerId::new("1")).await);
    client
        .speaker(&SpeakerId::new("1"), FetchPolicy::CacheFirst)
        .await
        .expect("speaker");

    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn reset_cache_makes_watchers_refetch() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server.clone()).await;
    let mut watch = client.watch_speakers(FetchPolicy::CacheFirst);
    assert!(next_state(&mut watch).await.is_loading());
    assert!(next_state(&mut watch).await.is_ready());

    server.directory.speakers.lock().await.push(speaker("2", true));
    client.reset_cache().await;

    assert!(next_state(&mut watch).await.is_loading());
    let refetched = next_state(&mut watch).await;
    assert_eq!(refetched.data().map(Vec::len), Some(2));
    assert_eq!(server.request_count(), 2);
    assert_eq!(client.cached_speakers().await.map(|s| s.len()), Some(2));
}

#[tokio::test]
async fn reset_cache_empties_the_store() {
    let server = FakeServer::new(vec![speaker("1", false)]);
    let client = client_for(server).await;
    client.speakers(FetchPolicy::CacheFirst).await.expect("speakers");
    let mut events = client.subscribe_events();

    client.reset_cache().await;

    assert!(client.cached_speakers().await.is_none());
    assert_eq!(events.try_recv().ok(), Some(ClientEvent::CacheReset));
    let err = client
        .speakers(FetchPolicy::CacheOnly)
        .await
        .expect_err("must miss");
    assert!(matches!(err, ClientError::CacheMiss { .. }));
}

#[test]
fn event_touches_matches_identifiers() {
    let id = SpeakerId::new("1");
    assert!(ClientEvent::CacheUpdated {
        ids: vec![id.clone()]
    }
    .touches(&id));
    assert!(!ClientEvent::SpeakerUpdated(FeaturedUpdate {
        id: SpeakerId::new("2"),
        featured: true,
    })
    .touches(&id));
    assert!(ClientEvent::CacheReset.touches(&id));
}
