//! duckle keeps an in-memory view of bank transactions in step with a statement server.
//!
//! The view can be sorted by any column without touching the server, and category changes are
//! shown right away and undone if the server rejects them.

mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod sync;
mod utils;
pub mod view;


pub use api::{Mode, RemoteStore, UploadSummary};
pub use config::{Config, DEFAULT_REMOTE_URL};
pub use error::{Error, ErrorType, Result};
pub use sync::{Mutation, MutationState, SyncController};
pub use view::ViewState;
