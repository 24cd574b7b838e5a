//! ChatSearch: background answer server for search result pages.

use std::sync::Arc;

use chatsearch_core::ChatSearchConfig;
use chatsearch_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                println!("ChatSearch: AI answers for search result pages");
                println!();
                println!("Usage: chatsearch [command]");
                println!();
                println!("Commands:");
                println!("  (none)    Start the server");
                println!("  help      Show this help message");
                println!();
                println!("Environment:");
                println!("  CHATSEARCH_PORT                 listen port (default 3004)");
                println!("  CHATSEARCH_SESSION_URL          credential lookup endpoint");
                println!("  CHATSEARCH_CONVERSATION_URL     streaming conversation endpoint");
                println!("  CHATSEARCH_MODEL                model identifier");
                println!("  CHATSEARCH_CREDENTIAL_TTL_SECS  credential cache TTL (default 10)");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'chatsearch help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = ChatSearchConfig::from_env();
    let port = config.port;
    info!("Chat backend: {}", config.backend.conversation_url);

    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ChatSearch server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
