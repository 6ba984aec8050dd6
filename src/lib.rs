//! # ytdl-web
//!
//! A small local web front-end for fetching YouTube media. All of the hard
//! work (stream resolution, format negotiation, transcoding) is delegated to
//! the external `yt-dlp` and `ffmpeg` binaries; this crate is the glue that
//! exposes them over a handful of local-only HTTP endpoints and relays
//! download progress back to the browser.
//!
//! ## Usage
//!
//! ```no_run
//! use ytdl_web::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Resolve configuration from the environment (PORT, DOWNLOAD_DIR,
//!     // YTDLP_BIN, FFMPEG_BIN) and make sure the audio/ and video/
//!     // subdirectories exist before anything is written.
//!     let config = Config::from_env();
//!     config.ensure_directories().unwrap();
//!
//!     let app = server::router(server::AppState::new(config));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5000")
//!         .await
//!         .unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! The `worker` module owns the per-download background task: it spawns
//! yt-dlp, streams its progress lines into a shared
//! [`status::StatusRegistry`] and records the produced file once the process
//! exits.

#[forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod config;
pub mod ffmpeg;
pub mod progress;
pub mod server;
pub mod status;
pub mod video_info;
pub mod worker;
pub mod ytdlp;
