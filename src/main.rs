use biz_onboard::chat::{ChatRouteState, chat_routes};
use biz_onboard::llm::{LlmConfig, create_provider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let llm_config = LlmConfig::from_env().unwrap_or_else(|err| {
        eprintln!("Error: {}", err);
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let port: u16 = std::env::var("BIZ_ONBOARD_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    eprintln!("🧭 Biz Onboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm_config.model);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat", port);

    let llm = create_provider(&llm_config);

    let app = chat_routes(ChatRouteState { llm });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "Chat server started");
    axum::serve(listener, app).await?;

    Ok(())
}
