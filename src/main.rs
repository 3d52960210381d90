//! Branch Clock - a per-branch work timer that logs time to an issue tracker
//!
//! This is the main entry point for the branch-clock daemon and its
//! configure command.

use std::{sync::Arc, time::Duration};
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use branch_clock::{
    api::create_router,
    config::{settings_path, Command, Config, ConfigureArgs, ServeArgs, Settings, SettingsFile, TrackerSettings},
    coordinator::Coordinator,
    services::{
        credentials::TOKEN_KEY, GitBranchSource, JiraClient, KeyringStore, NoticeLevel,
        PromptBoard, Prompter, Secret, SecretStore, TrackerClient,
    },
    state::AppState,
    tasks::ticker_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("branch_clock={},tower_http=info", config.log_level()))
        .init();

    let settings_file = settings_path(config.settings.as_deref())
        .context("Failed to resolve settings path")?;

    match config.command {
        Some(Command::Configure(args)) => configure(args, &settings_file).await,
        Some(Command::Serve(args)) => serve(args, &settings_file).await,
        None => serve(config.serve, &settings_file).await,
    }
}

async fn serve(args: ServeArgs, settings_file: &std::path::Path) -> anyhow::Result<()> {
    info!("Starting branch-clock v{}", env!("CARGO_PKG_VERSION"));
    info!("Settings file: {}", settings_file.display());

    let store = KeyringStore::new();
    let settings = Settings::load(settings_file, &store, args.token.clone().map(Secret::new));
    let prompts = Arc::new(PromptBoard::new());

    let state = Arc::new(AppState::new(
        settings.clone(),
        Arc::clone(&prompts),
        args.port,
        args.host.clone(),
    ));

    // Start the one-second ticker
    let ticker_state = Arc::clone(&state);
    tokio::spawn(async move {
        ticker_task(ticker_state).await;
    });

    match &settings {
        Settings::Configured(tracker_settings) => {
            info!(
                "Configuration: repo={}, tracker={}, inactivity={}s, auto_logging={}, threshold={}s",
                args.repo.display(),
                tracker_settings.tracker_url,
                tracker_settings.inactivity_timeout_secs,
                tracker_settings.auto_log_enabled,
                tracker_settings.auto_log_threshold_secs
            );

            let tracker = Arc::new(JiraClient::new(
                tracker_settings,
                Duration::from_secs(args.http_timeout_secs),
            ));
            if !tracker.validate_credentials().await {
                prompts.notify(
                    NoticeLevel::Warning,
                    "Tracker credentials were rejected; worklogs will fail until reconfigured".to_string(),
                );
            }

            let branches = Arc::new(GitBranchSource::new(
                args.repo.clone(),
                Duration::from_millis(args.branch_cache_ms),
            ));
            let (coordinator, handle) = Coordinator::new(
                Arc::clone(&state),
                tracker_settings.clone(),
                branches,
                tracker,
                prompts,
            );
            tokio::spawn(coordinator.run());

            // Pick up the branch we started on
            if let Err(e) = handle.activity() {
                warn!("Initial activity was not delivered: {}", e);
            }
            if let Err(e) = state.attach_coordinator(handle) {
                error!("{}", e);
            }
        }
        Settings::Unconfigured { reason } => {
            warn!("Running unconfigured ({}); run `branch-clock configure` and restart", reason);
        }
    }

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = args.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /activity            - Report user activity");
    info!("  POST /timer/start         - Start the timer");
    info!("  POST /timer/pause         - Pause the timer");
    info!("  POST /timer/reset         - Reset the timer");
    info!("  PUT  /task                - Override the current task");
    info!("  POST /log                 - Log the current task's time now");
    info!("  GET  /prompt              - Pending confirmation");
    info!("  POST /prompt/:id/answer   - Answer a confirmation");
    info!("  GET  /status              - Timer, prompt and notices");
    info!("  GET  /health              - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        signal = shutdown_signal() => {
            match signal {
                Ok(_) => info!("Shutdown signal received"),
                Err(e) => error!("Signal handling failed: {}", e),
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn configure(args: ConfigureArgs, settings_file: &std::path::Path) -> anyhow::Result<()> {
    let file = SettingsFile {
        tracker_url: Some(args.tracker_url.clone()),
        inactivity_timeout: Some(args.inactivity_timeout),
        auto_logging: Some(args.auto_logging),
        auto_logging_time: Some(args.auto_logging_time),
    };
    let secret = Secret::new(args.token.trim());
    let settings = TrackerSettings::from_parts(&file, Some(secret.clone()))
        .context("Refusing to store incomplete settings")?;

    if args.skip_validation {
        warn!("Skipping credential validation");
    } else {
        let client = JiraClient::new(&settings, Duration::from_secs(args.http_timeout_secs));
        client
            .probe()
            .await
            .context("Tracker rejected the credential")?;
        info!("Tracker credentials are valid");
    }

    KeyringStore::new()
        .save(TOKEN_KEY, &secret)
        .map_err(anyhow::Error::msg)
        .context("Failed to store credential")?;
    settings
        .to_file()
        .write(settings_file)
        .context("Failed to write settings")?;

    info!("Settings written to {}", settings_file.display());
    println!("tracker url:        {}", settings.tracker_url);
    println!("inactivity timeout: {}s", settings.inactivity_timeout_secs);
    println!("auto logging:       {}", settings.auto_log_enabled);
    println!("auto logging time:  {}s", settings.auto_log_threshold_secs);
    println!("Restart the daemon to apply.");
    Ok(())
}
