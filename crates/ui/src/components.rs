//! Speaker list and detail components.
//!
//! Each component maps one `QueryState` to markup. Loading and failure
//! replace the whole component with a single status line.

use client_core::QueryState;
use shared::{domain::Speaker, protocol::MarkFeaturedVariables};

use crate::markup::{Element, Node};

pub const SPEAKERS_LOADING: &str = "Loading Speakers...";
pub const SPEAKERS_ERROR: &str = "Error Loading Speakers!";
pub const SPEAKER_LOADING: &str = "Loading Speaker...";
pub const SPEAKER_ERROR: &str = "Error Loading Speaker!";
pub const FEATURED_LABEL: &str = "Featured Speaker";

const FEATURED_COLOR: &str = "gold";

fn status(message: &str) -> Node {
    Element::new("p").text(message).into()
}

pub fn speaker_list(state: &QueryState<Vec<Speaker>>) -> Node {
    match state {
        QueryState::Loading => status(SPEAKERS_LOADING),
        QueryState::Failed(_) => status(SPEAKERS_ERROR),
        QueryState::Ready(speakers) => Node::Fragment(speakers.iter().map(speaker_card).collect()),
    }
}

fn speaker_card(speaker: &Speaker) -> Node {
    let sessions = speaker.sessions.iter().map(|session| {
        Element::new("span")
            .attr("data-session-id", session.id.as_str())
            .style("padding: 2px")
            .child(Element::new("p").text(session.title.clone()))
    });

    Element::new("div")
        .attr("data-speaker-id", speaker.id.as_str())
        .class("col-xs-12 col-sm-6 col-md-6")
        .style("padding: 5px")
        .child(
            Element::new("div")
                .class("panel panel-default")
                .child(
                    Element::new("div").class("panel-heading").child(
                        Element::new("h3")
                            .class("panel-title")
                            .text(format!("Speaker: {}", speaker.name)),
                    ),
                )
                .child(
                    Element::new("div")
                        .class("panel-body")
                        .child(Element::new("h5").text(format!("Bio: {}", speaker.bio))),
                )
                .child(
                    Element::new("div")
                        .class("panel-footer")
                        .child(Element::new("h3").class("panel-title").text("Sessions"))
                        .children(sessions)
                        .child(Element::new("span").child(featured_button(speaker))),
                ),
        )
        .into()
}

/// Toggle button; its star reflects the flag captured at render time.
pub fn featured_button(speaker: &Speaker) -> Element {
    let mut star = Element::new("i")
        .class(if speaker.featured {
            "fa fa-star"
        } else {
            "fa fa-star-o"
        })
        .attr("aria-hidden", "true");
    if speaker.featured {
        star = star.style(format!("color: {FEATURED_COLOR}"));
    }

    Element::new("button")
        .attr("type", "button")
        .class("btn btn-default btn-lg")
        .attr("data-speaker-id", speaker.id.as_str())
        .attr("data-featured", speaker.featured.to_string())
        .child(star)
        .text(format!(" {FEATURED_LABEL}"))
}

/// Variables sent when the toggle button of `speaker` is clicked.
pub fn toggle_featured_variables(speaker: &Speaker) -> MarkFeaturedVariables {
    MarkFeaturedVariables::new(&speaker.id, !speaker.featured)
}

pub fn speaker_details(state: &QueryState<Speaker>) -> Node {
    let speaker = match state {
        QueryState::Loading => return status(SPEAKER_LOADING),
        QueryState::Failed(_) => return status(SPEAKER_ERROR),
        QueryState::Ready(speaker) => speaker,
    };

    let sessions = speaker.sessions.iter().map(|session| {
        Element::new("div")
            .attr("data-session-id", session.id.as_str())
            .child(Element::new("p").text(session.title.clone()))
    });

    Element::new("div")
        .attr("data-speaker-id", speaker.id.as_str())
        .class("col-xs-12")
        .style("padding: 5px")
        .child(
            Element::new("div")
                .class("panel panel-default")
                .child(
                    Element::new("div")
                        .class("panel-heading")
                        .child(Element::new("h3").class("panel-title").text(speaker.name.clone())),
                )
                .child(
                    Element::new("div")
                        .class("panel-body")
                        .child(Element::new("h5").text(speaker.bio.clone())),
                )
                .child(Element::new("div").class("panel-footer").children(sessions)),
        )
        .into()
}

#[cfg(test)]
#[path = "tests/components_tests.rs"]
mod tests;
