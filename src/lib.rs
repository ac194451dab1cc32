//! Client side of a computer-use agent: resolution scaling between the real
//! desktop and the model, the streamed event protocol, and the session state
//! machine that folds events into a conversation.

pub mod api;
pub mod config;
pub mod desktop;
pub mod scaling;
pub mod state;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;
