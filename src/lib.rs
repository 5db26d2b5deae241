//! # Crop service
//!
//! Two small agricultural backends:
//! - plant disease diagnosis, which forwards an image to an external multimodal
//!   model and normalizes its answer into a [`diagnosis::DiagnosisRecord`];
//! - crop yield prediction over a pre-trained regression model, served over
//!   HTTP or from the command line.

pub mod config;
pub mod diagnosis;
pub mod logging;
pub mod model;
pub mod provider;
pub mod server;
pub mod utils;
