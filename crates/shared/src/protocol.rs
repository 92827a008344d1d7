//! GraphQL operations against the conference schema and the request/response
//! envelope used to send them.
//!
//! Documents are derived with `cynic` from `schemas/conference.graphql`, so a
//! selection that does not exist on `Speaker` fails to compile. Both speaker
//! queries select through the same `SpeakerInfo` fragment, so a speaker decoded
//! from either one carries the full field set and can be stored by identifier
//! without shadowing fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FeaturedUpdate, Session, SessionId, Speaker, SpeakerId};

#[cynic::schema("conference")]
mod schema {}

#[derive(cynic::QueryFragment, Debug, Clone, PartialEq)]
#[cynic(graphql_type = "Session")]
pub struct SessionInfo {
    pub id: cynic::Id,
    pub title: String,
}

#[derive(cynic::QueryFragment, Debug, Clone, PartialEq)]
#[cynic(graphql_type = "Speaker")]
pub struct SpeakerInfo {
    pub id: cynic::Id,
    pub name: String,
    pub bio: String,
    pub sessions: Vec<SessionInfo>,
    pub featured: bool,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Query")]
pub struct SpeakersQuery {
    pub speakers: Vec<SpeakerInfo>,
}

#[derive(cynic::QueryVariables, Debug, Clone, PartialEq)]
pub struct SpeakerByIdVariables {
    pub id: cynic::Id,
}

impl SpeakerByIdVariables {
    pub fn new(id: &SpeakerId) -> Self {
        Self {
            id: cynic::Id::new(id.as_str()),
        }
    }
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Query", variables = "SpeakerByIdVariables")]
pub struct SpeakerByIdQuery {
    #[arguments(id: $id)]
    pub speaker_by_id: Option<SpeakerInfo>,
}

#[derive(cynic::QueryVariables, Debug, Clone, PartialEq)]
pub struct MarkFeaturedVariables {
    pub speaker_id: cynic::Id,
    pub featured: bool,
}

impl MarkFeaturedVariables {
    pub fn new(speaker_id: &SpeakerId, featured: bool) -> Self {
        Self {
            speaker_id: cynic::Id::new(speaker_id.as_str()),
            featured,
        }
    }

    pub fn speaker_id(&self) -> SpeakerId {
        SpeakerId::new(self.speaker_id.inner())
    }
}

/// Selection of `markFeatured`: the identifier plus the flag it changed.
#[derive(cynic::QueryFragment, Debug, Clone, PartialEq)]
#[cynic(graphql_type = "Speaker")]
pub struct FeaturedFlag {
    pub id: cynic::Id,
    pub featured: bool,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Mutation", variables = "MarkFeaturedVariables")]
pub struct ToggleFeaturedSpeaker {
    #[arguments(speakerId: $speaker_id, featured: $featured)]
    pub mark_featured: FeaturedFlag,
}

impl From<SessionInfo> for Session {
    fn from(info: SessionInfo) -> Self {
        Session {
            id: SessionId::new(info.id.into_inner()),
            title: info.title,
        }
    }
}

impl From<SpeakerInfo> for Speaker {
    fn from(info: SpeakerInfo) -> Self {
        Speaker {
            id: SpeakerId::new(info.id.into_inner()),
            name: info.name,
            bio: info.bio,
            sessions: info.sessions.into_iter().map(Session::from).collect(),
            featured: info.featured,
        }
    }
}

impl From<FeaturedFlag> for FeaturedUpdate {
    fn from(flag: FeaturedFlag) -> Self {
        FeaturedUpdate {
            id: SpeakerId::new(flag.id.into_inner()),
            featured: flag.featured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Value,
}

impl GraphQLRequest {
    /// Lowers a typed operation into the untyped wire envelope.
    pub fn from_operation<Q, V: Serialize>(
        operation: &cynic::Operation<Q, V>,
    ) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(operation)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse<T = Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl<T> GraphQLResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<GraphQLError>) -> Self {
        Self {
            data: None,
            errors,
        }
    }
}
