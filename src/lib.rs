//! # ETH Outlook
//!
//! Terminal front end for the `price_forecast` pipeline. Two binaries share
//! this library:
//!
//! - `tune` re-tunes the model on fresh history and refreshes the store
//! - `dashboard` forecasts a user-chosen horizon and renders it with the
//!   stored accuracy outlook

pub mod cli;
pub mod render;

pub use crate::cli::{build_source, init_logging, load_config, SourceKind};
pub use crate::render::render_dashboard;
