#[macro_use]
extern crate log;

use std::net::SocketAddr;

use ytdl_web::{config::Config, ffmpeg, server, ytdlp::Ytdlp};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    config
        .ensure_directories()
        .expect("Could not create download directories");
    info!("Download directory: {}", config.download_dir.display());

    // yt-dlp does all the actual work, so refuse to start without it
    let ytdlp = Ytdlp::new(config.ytdlp_bin.clone());
    match ytdlp.version().await {
        Some(version) => info!("Found yt-dlp {}", version),
        None => {
            error!(
                "yt-dlp not found (looked for '{}'); install it or set YTDLP_BIN",
                config.ytdlp_bin
            );
            std::process::exit(1);
        }
    }

    match ffmpeg::version(&config.ffmpeg_bin).await {
        Some(version) => info!("Found {}", version),
        None => warn!("ffmpeg not found; MP3 conversion will not work"),
    }

    // Single-user tool: bind localhost only
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let app = server::router(server::AppState::new(config));

    info!("Open http://{} in your browser", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Could not bind listener");
    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}
