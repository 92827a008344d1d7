use client_core::QueryState;
use shared::domain::Speaker;

use crate::{
    components::{speaker_details, speaker_list},
    markup::{Element, Node},
};

fn layout(content: Node) -> Node {
    Element::new("div")
        .class("container")
        .child(Element::new("div").class("row").child(content))
        .into()
}

pub fn speakers_page(state: &QueryState<Vec<Speaker>>) -> Node {
    layout(speaker_list(state))
}

pub fn speaker_page(state: &QueryState<Speaker>) -> Node {
    layout(speaker_details(state))
}

pub fn not_found_page(path: &str) -> Node {
    layout(Element::new("p").text(format!("No page at {path}")).into())
}
