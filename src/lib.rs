/*!
 * # subgate - unified subtitle search and download gateway
 *
 * A Rust library normalizing several subtitle providers behind one request
 * and response shape.
 *
 * ## Features
 *
 * - Search and download across providers:
 *   - OpenSubtitles (REST, API key)
 *   - SubDL (REST, API key)
 *   - SubSource (multi-step REST)
 *   - BSPlayer (SOAP with login sessions)
 *   - Addic7ed (scraped HTML, TV episodes only)
 * - One canonical subtitle schema whatever the upstream
 * - One error taxonomy mapped onto HTTP status codes
 * - HTTP gateway built on axum
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `models`: Canonical request and response schema
 * - `normalize`: Shared builder turning upstream items into canonical subtitles
 * - `language_utils`: ISO language code and language name utilities
 * - `transport`: HTTP helpers mapping transport failures and status codes
 * - `providers`: One adapter per upstream plus the registry that selects them
 * - `gateway`: Provider resolution and invocation
 * - `server`: axum routes and error responses
 * - `app_config`: Configuration management
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod gateway;
pub mod language_utils;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod server;
pub mod transport;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError};
pub use gateway::Gateway;
pub use models::{DownloadRequest, DownloadResult, SearchRequest, SearchResult, Subtitle};
pub use providers::{ProviderKind, ProviderRegistry, SubtitleProvider};
