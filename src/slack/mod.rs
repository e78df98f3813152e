// ABOUTME: Slack Web API transport built on slack-morphism
// ABOUTME: Only compiled with the `slack` feature

pub mod web;

pub use web::SlackWebClient;
