//! hostd REST API Client
//!
//! A Rust client library for the hostd API: server and profile
//! configuration guarded by ETags, cluster membership, and background
//! operations.
//!
//! # Example
//!
//! ```no_run
//! use hostd_client::{HostClient, HostClientTrait};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HostClient::new("https://10.0.0.1:8443".to_string())?;
//!
//! // Form a new cluster and wait at most a minute for it
//! let mut op = client.bootstrap_cluster("node1").await?;
//! op.wait(&client, Duration::from_secs(60)).await?;
//!
//! let members = client.get_cluster_member_names().await?;
//! println!("members: {:?}", members);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Optimistic Concurrency**: every read returns the resource ETag, updates send it back
//! - **Cluster Membership**: bootstrap, accept, join, leave, list and rename
//! - **Operations**: explicit handles with poll, deadline-bounded wait and cancel
//! - **Mocking**: `MockHostClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
pub mod operation;
#[path = "trait.rs"]
pub mod host_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::HostClient;
pub use common::HttpClient;
pub use error::HostError;
pub use host_trait::HostClientTrait;
pub use models::*;
pub use operation::Operation;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockHostClient;
