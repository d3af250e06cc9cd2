//! Watch command - stream change events as JSON lines.

use tokio::sync::broadcast::error::RecvError;

use crate::config::Settings;
use crate::paths::ScopeResolver;
use crate::watcher::ChangeWatcher;

/// Watch until Ctrl-C, printing one JSON object per change.
pub async fn run(
    resolver: &ScopeResolver,
    settings: &Settings,
    debounce_ms: Option<u64>,
) -> anyhow::Result<()> {
    let mut builder = ChangeWatcher::builder()
        .settings(&settings.watch)
        .resolver(resolver.clone());
    if let Some(ms) = debounce_ms {
        builder = builder.debounce_ms(ms);
    }

    let mut watcher = builder.build();
    let mut events = watcher.subscribe();
    let summary = watcher.start()?;
    eprintln!(
        "Watching {} config files in {} directories (Ctrl-C to stop)",
        summary.config_files, summary.directories
    );
    if summary.skipped > 0 {
        eprintln!("Could not watch {} locations; see log for details", summary.skipped);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            received = events.recv() => match received {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("[watch] dropped {missed} events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    watcher.stop();
    Ok(())
}
