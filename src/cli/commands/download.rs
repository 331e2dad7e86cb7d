//! Download flyers command.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::sync::mpsc;

use crate::cli::progress::FlyerProgress;
use crate::config::Settings;
use crate::repository::{JsonMetadataStore, MetadataStore};
use crate::scrapers::http_client::resolve_user_agent;
use crate::scrapers::{BrowserFetcher, HttpClient, PageContentProvider, StaticPageProvider};
use crate::services::{DownloadConfig, DownloadEvent, DownloadService};

/// Download new flyers into the configured output directory.
pub async fn cmd_download(
    settings: &Settings,
    force: bool,
    static_page: bool,
    show_progress: bool,
) -> anyhow::Result<()> {
    let store = JsonMetadataStore::load(settings.metadata_path())?;
    let known = store.records().len();

    let client = HttpClient::new(
        Duration::from_secs(settings.request_timeout),
        settings.user_agent.as_deref(),
    )?;

    let provider: Box<dyn PageContentProvider> = if static_page {
        Box::new(StaticPageProvider::new(client.clone()))
    } else {
        let mut browser_config = settings.browser.clone();
        if browser_config.user_agent.is_none() && settings.user_agent.is_some() {
            browser_config.user_agent = Some(resolve_user_agent(settings.user_agent.as_deref()));
        }
        Box::new(BrowserFetcher::new(browser_config))
    };

    println!(
        "{} Fetching flyers from {} ({} already recorded)",
        style("→").cyan(),
        settings.listing_url,
        known
    );
    if force {
        println!("  {} Duplicate checks disabled", style("!").yellow());
    }

    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);

    let mut service = DownloadService::new(
        provider,
        Box::new(client),
        Box::new(store),
        DownloadConfig {
            listing_url: settings.listing_url.clone(),
            link_pattern: settings.link_pattern.clone(),
            store_name: settings.store_name.clone(),
        },
    )
    .with_events(event_tx);

    // Set up progress display (UI concern)
    let progress = if show_progress {
        Some(Arc::new(FlyerProgress::new()))
    } else {
        None
    };

    // Spawn event handler task (UI layer)
    let progress_clone = progress.clone();
    let event_handler = tokio::spawn(async move {
        let say = |message: String| match progress_clone {
            Some(ref p) => p.println(&message),
            None => println!("{}", message),
        };

        while let Some(event) = event_rx.recv().await {
            match event {
                DownloadEvent::LinksFound { count } => {
                    if let Some(ref p) = progress_clone {
                        p.set_total(count);
                    }
                }
                DownloadEvent::Started { title, .. } => {
                    if let Some(ref p) = progress_clone {
                        p.start(&title);
                    }
                }
                DownloadEvent::Completed { path, bytes, .. } => {
                    say(format!(
                        "{} {} ({} KB)",
                        style("✓").green(),
                        path.display(),
                        bytes / 1024
                    ));
                    if let Some(ref p) = progress_clone {
                        p.advance();
                    }
                }
                DownloadEvent::Skipped {
                    url,
                    reason,
                    existing,
                } => {
                    say(format!(
                        "{} {} already downloaded as {} (by {})",
                        style("→").dim(),
                        url,
                        existing,
                        reason
                    ));
                    if let Some(ref p) = progress_clone {
                        p.advance();
                    }
                }
                DownloadEvent::Failed {
                    url,
                    error,
                    diagnostic,
                } => {
                    say(format!("{} {}: {}", style("✗").red(), url, error));
                    if let Some(path) = diagnostic {
                        say(format!(
                            "  {} diagnostic saved to {}",
                            style("→").dim(),
                            path.display()
                        ));
                    }
                    if let Some(ref p) = progress_clone {
                        p.advance();
                    }
                }
            }
        }
    });

    // Run download service (business logic)
    let result = service.run(&settings.output_dir, force).await;

    // Dropping the service closes the event channel
    drop(service);
    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }
    if let Some(ref p) = progress {
        p.finish();
    }

    let result = result?;

    println!(
        "{} Downloaded {} flyers",
        style("✓").green(),
        result.downloaded
    );
    if result.skipped > 0 {
        println!(
            "  {} {} skipped as duplicates",
            style("→").dim(),
            result.skipped
        );
    }
    if result.failed > 0 {
        println!("  {} {} failed", style("✗").red(), result.failed);
    }
    if result.downloaded + result.skipped + result.failed == 0 {
        println!(
            "  {} No flyer links found on the listing page",
            style("!").yellow()
        );
    }

    Ok(())
}
