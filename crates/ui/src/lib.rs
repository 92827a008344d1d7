//! Rendering layer: components, page wrappers, routing and the app shell
//! that connects them to the GraphQL client.

pub mod app;
pub mod components;
pub mod markup;
pub mod pages;
pub mod router;

pub use app::ConferenceApp;
pub use markup::{Element, Node};
pub use router::Route;
