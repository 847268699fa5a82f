use flashdeck::api::{app_router, ApiState};
use flashdeck::app::App;
use flashdeck::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let app = App::new(config.clone()).await?;
    log::info!(
        "Using store {} (recent window {} days, shuffle {})",
        config.database_url,
        config.recent_window_days,
        config.shuffle_cards
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app_router(ApiState::new(app))).await?;

    Ok(())
}
