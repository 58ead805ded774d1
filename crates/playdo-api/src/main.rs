//! Playdo CLI and REST API entry point.
//!
//! Binary name: `playdo`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,playdo=debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "playdo", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(api_key) = http::extractors::auth::ensure_api_key(&state).await? {
                println!();
                println!(
                    "  {} API key generated (save this -- it won't be shown again):",
                    console::style("🔑").bold()
                );
                println!();
                println!("  {}", console::style(&api_key).yellow().bold());
                println!();
            }

            if !state.upstream_configured {
                println!(
                    "  {} ANTHROPIC_API_KEY is not set; send_message will answer 503 until it is.",
                    console::style("!").yellow().bold()
                );
            }

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;

            println!(
                "  {} Playdo API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {}",
                console::style(format!("Data directory: {}", state.data_dir.display())).dim()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let db_pool = state.db_pool.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            db_pool.close().await;

            println!("\n  Server stopped.");
        }

        Commands::New => {
            cli::conversation::new_conversation(&state, cli.json).await?;
        }

        Commands::List => {
            cli::conversation::list_conversations(&state, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::conversation::show_conversation(&state, &id, cli.json).await?;
        }

        Commands::Send {
            id,
            message,
            code_file,
            stdout_file,
            stderr_file,
        } => {
            cli::conversation::send_message(
                &state,
                &id,
                message,
                code_file.as_deref(),
                stdout_file.as_deref(),
                stderr_file.as_deref(),
                cli.json,
            )
            .await?;
        }

        Commands::Chat { id, code_file, run } => {
            cli::chat::loop_runner::run_chat_loop(&state, id, code_file, run).await?;
        }

        Commands::Delete { id, force } => {
            cli::conversation::delete_conversation(&state, &id, force, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. If a handler cannot be installed, that
/// signal is ignored and the other still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
