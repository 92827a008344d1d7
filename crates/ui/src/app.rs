//! App shell: resolves routes to pages and dispatches button actions to the
//! GraphQL client.

use std::sync::Arc;

use client_core::{ClientError, ConferenceClient, FetchPolicy};
use futures::stream::{self, BoxStream, StreamExt};
use shared::domain::{FeaturedUpdate, Speaker, SpeakerId};
use tracing::{debug, warn};

use crate::{
    components::toggle_featured_variables,
    markup::Node,
    pages::{not_found_page, speaker_page, speakers_page},
    router::Route,
};

/// Pages answer from the store when their root field is cached.
const PAGE_POLICY: FetchPolicy = FetchPolicy::CacheFirst;

#[derive(Clone)]
pub struct ConferenceApp {
    client: Arc<ConferenceClient>,
}

impl ConferenceApp {
    pub fn new(client: Arc<ConferenceClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ConferenceClient> {
        &self.client
    }

    pub async fn render_path(&self, path: &str) -> Node {
        match Route::parse(path) {
            Some(route) => self.render_route(&route).await,
            None => {
                debug!(path, "no route matched");
                not_found_page(path)
            }
        }
    }

    pub async fn render_route(&self, route: &Route) -> Node {
        match route {
            Route::Speakers => speakers_page(&self.client.query_speakers(PAGE_POLICY).await),
            Route::Speaker(id) => speaker_page(&self.client.query_speaker(id, PAGE_POLICY).await),
        }
    }

    /// Re-rendered page for every state change of the route's query.
    pub fn watch_route(&self, route: &Route) -> BoxStream<'static, Node> {
        match route {
            Route::Speakers => self
                .client
                .watch_speakers(PAGE_POLICY)
                .map(|state| speakers_page(&state))
                .boxed(),
            Route::Speaker(id) => self
                .client
                .watch_speaker(id.clone(), PAGE_POLICY)
                .map(|state| speaker_page(&state))
                .boxed(),
        }
    }

    pub fn watch_path(&self, path: &str) -> BoxStream<'static, Node> {
        match Route::parse(path) {
            Some(route) => self.watch_route(&route),
            None => stream::once(futures::future::ready(not_found_page(path))).boxed(),
        }
    }

    /// Click handler of a speaker's toggle button, using the flag the button
    /// was rendered with.
    pub async fn toggle_featured(&self, speaker: &Speaker) -> Result<FeaturedUpdate, ClientError> {
        let variables = toggle_featured_variables(speaker);
        let speaker_id = variables.speaker_id();
        debug!(
            speaker_id = %speaker_id,
            featured = variables.featured,
            "dispatching featured toggle"
        );
        self.client
            .mark_featured(&speaker_id, variables.featured)
            .await
            .inspect_err(|err| {
                warn!(speaker_id = %speaker_id, error = %err, "featured toggle failed");
            })
    }

    pub async fn toggle_featured_by_id(
        &self,
        id: &SpeakerId,
    ) -> Result<FeaturedUpdate, ClientError> {
        let speaker = self.client.speaker(id, FetchPolicy::CacheFirst).await?;
        self.toggle_featured(&speaker).await
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
