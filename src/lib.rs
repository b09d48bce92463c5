//! # MinIO Activity
//!
//! A Rust activity for workflow hosts that performs one bucket or object
//! operation against MinIO or any S3-compatible storage service per
//! evaluation.
//!
//! ## Features
//!
//! - `BucketExists`, `MakeBucket`, `GetObject`, `PutObject`, `RemoveObject`
//! - JSON or flattened two-line CSV encoding of `PutObject` payloads
//! - Settings expressions (`=$env[...]`, `=$property[...]`) through an
//!   injected [`Resolver`]
//! - Custom CA bundles and client certificates for private deployments
//! - Results and errors always reported as an [`Output`], never as a failure
//!
//! ## Example
//!
//! ```rust,no_run
//! use elizaos_plugin_minio::{Input, Method, MinioActivity, Settings};
//! use serde_json::json;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::new(
//!         "localhost:9000",
//!         "minioadmin",
//!         "minioadmin",
//!         "flogo",
//!         Method::PutObject,
//!     );
//!     let activity = MinioActivity::new(settings).await?;
//!
//!     let input = Input::new("inbox/order.csv")
//!         .format("CSV")
//!         .data(json!({"id": "42", "customer": {"vip": true}}));
//!     let output = activity.eval(&input).await;
//!     assert!(output.is_success());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod activity;
pub mod coerce;
pub mod config;
pub mod encode;
pub mod error;
pub mod fake;
pub mod resolve;
pub mod store;
pub mod tls;
pub mod types;

pub use activity::MinioActivity;
pub use config::{Method, Settings, SslConfig, DEFAULT_REGION};
pub use encode::{encode, encode_csv, encode_value, flatten, FlattenedRecord};
pub use error::{MinioError, Result};
pub use resolve::{CompositeResolver, Resolver};
pub use store::{ObjectStore, S3ObjectStore, StoredObject};
pub use types::*;

use anyhow::Result as AnyhowResult;

/// Name the activity is registered under.
pub const PLUGIN_NAME: &str = "minio";
/// Crate version.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");
/// One-line description for host registries.
pub const PLUGIN_DESCRIPTION: &str =
    "Bucket and object operations against MinIO and S3-compatible storage";

/// Creates a MinIO activity using environment variables for configuration.
///
/// See [`Settings::from_env`] for the variables read. `.env` files are
/// honoured.
///
/// # Returns
///
/// A `Result` containing the connected activity or an error if required
/// environment variables are missing.
pub async fn get_minio_activity() -> AnyhowResult<MinioActivity> {
    let settings = Settings::from_env()
        .map_err(|e| anyhow::anyhow!("Invalid MinIO configuration: {}", e))?;

    MinioActivity::new(settings)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create MinIO activity: {}", e))
}
