use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use werewolf_server::{app, utils::config::CONFIG};

// ログ設定。RUST_LOG があればそちらを優先
fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("werewolf_server", LevelFilter::Debug)
        .filter_module("werewolf_rules", LevelFilter::Debug)
        .filter_module("tower_http", LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: .envファイルの読み込みに失敗しました: {}", e);
    }

    init_logger();

    // CORSレイヤーの設定
    let origin = CONFIG
        .allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid origin {}", CONFIG.allowed_origin))?;
    let cors = CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE]);

    let app = app::create_app().layer(cors).layer(
        TraceLayer::new_for_http() // HTTPトレースログを有効化
            .make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
    );

    let listener = tokio::net::TcpListener::bind(&CONFIG.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", CONFIG.bind_addr))?;

    log::info!("サーバーを起動しました: http://{}", CONFIG.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
