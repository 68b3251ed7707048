//! Megaverse Core - canvas reconciliation engine
//!
//! Drives a remote Megaverse canvas toward its goal map:
//! - Parses the goal grid into typed entities
//! - Issues create/delete calls with retry, backoff and pacing
//! - Fetches the goal and current canvas state
//! - Clears and replicates with bounded concurrency
//!
//! # Example
//!
//! ```rust,ignore
//! use megaverse_core::{CanvasConfig, HttpCanvasClient, Reconciler};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CanvasConfig::new().with_candidate_id("my-candidate");
//! let client = HttpCanvasClient::new(&config)?;
//! let reconciler = Reconciler::bootstrap(Arc::new(client), config.parallel_degree).await?;
//!
//! let report = reconciler.replicate().await?;
//! println!("Created {} entities", report.succeeded);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod goal;
pub mod parser;
pub mod pattern;
pub mod reconciler;
pub mod retry;

// Re-exports for convenience
pub use client::{CanvasApi, HttpCanvasClient, Operation};
pub use config::CanvasConfig;
pub use entity::{Color, Direction, Entity, EntityKind, Position, RequestBody, UnknownTokenError};
pub use error::{CanvasError, FailureKind, RemoteError};
pub use goal::{GoalMap, GoalSummary};
pub use parser::{parse_grid, parse_tag};
pub use reconciler::{BatchFailure, BatchReport, Reconciler, DEFAULT_PARALLEL_DEGREE};
pub use retry::RetryPolicy;
pub use reqwest::StatusCode;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Megaverse Core
    pub use crate::{
        CanvasApi, CanvasConfig, CanvasError, Color, Direction, Entity, EntityKind, GoalMap,
        HttpCanvasClient, Operation, Position, Reconciler,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
