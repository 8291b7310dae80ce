use env_logger::Env;

#[tokio::main]
async fn main() {
    // Load .env file if present (for development convenience)
    // Silently ignore if not found - production uses system env vars
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = argus_client::config::load_config();
    if let Err(e) = argus_client::run(config).await {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
