//! Flyer download service.
//!
//! Walks the listing page, skips flyers already on disk, and writes new ones
//! with descriptive filenames. Separated from UI concerns: progress is
//! reported through [`DownloadEvent`]s.

mod filename;
mod types;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{ProspektError, Result};
use crate::models::{FlyerDescriptor, FlyerRecord};
use crate::repository::MetadataStore;
use crate::scrapers::{
    extract_flyer_links, find_pdf_url, find_viewer_frame, is_pdf_url, FlyerLink,
    PageContentProvider, PdfFetcher,
};
use crate::services::dedup::{find_duplicate, DuplicateReason};
use crate::services::descriptor::DescriptorParser;

pub use filename::{build_filename, sanitize_component, FilenameAllocator};
pub use types::{DownloadConfig, DownloadEvent, DownloadResult};

/// What happened to a single link.
enum Outcome {
    Downloaded { path: PathBuf, bytes: u64 },
    Skipped { reason: DuplicateReason, existing: String },
}

/// Service for downloading flyers from the listing page.
pub struct DownloadService {
    provider: Box<dyn PageContentProvider>,
    fetcher: Box<dyn PdfFetcher>,
    store: Box<dyn MetadataStore>,
    parser: DescriptorParser,
    config: DownloadConfig,
    event_tx: Option<mpsc::Sender<DownloadEvent>>,
}

impl DownloadService {
    /// Create a new download service.
    pub fn new(
        provider: Box<dyn PageContentProvider>,
        fetcher: Box<dyn PdfFetcher>,
        store: Box<dyn MetadataStore>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            provider,
            fetcher,
            store,
            parser: DescriptorParser::default(),
            config,
            event_tx: None,
        }
    }

    /// Use a specific descriptor parser (fixed reference year).
    pub fn with_parser(mut self, parser: DescriptorParser) -> Self {
        self.parser = parser;
        self
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<DownloadEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Records currently in the metadata store.
    pub fn records(&self) -> &[FlyerRecord] {
        self.store.records()
    }

    /// Download every new flyer on the listing page into `output_dir`.
    ///
    /// With `force`, duplicate checks are skipped and every link is
    /// downloaded. The page provider is closed before returning, whatever
    /// the outcome.
    pub async fn run(&mut self, output_dir: &Path, force: bool) -> Result<DownloadResult> {
        let result = self.run_inner(output_dir, force).await;
        self.provider.close().await;
        result
    }

    async fn run_inner(&mut self, output_dir: &Path, force: bool) -> Result<DownloadResult> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| ProspektError::Write {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let listing_url = self.config.listing_url.clone();
        let html = self
            .provider
            .open_listing(&listing_url, &self.config.link_pattern)
            .await?;

        let links = extract_flyer_links(&html, &listing_url, &self.config.link_pattern);
        self.emit(DownloadEvent::LinksFound { count: links.len() })
            .await;

        let mut result = DownloadResult::default();
        if links.is_empty() {
            warn!("No flyer links found on {}", listing_url);
            return Ok(result);
        }
        info!("Found {} flyer links via {}", links.len(), self.provider.name());

        let mut allocator = FilenameAllocator::new(output_dir);

        for (index, link) in links.iter().enumerate() {
            self.emit(DownloadEvent::Started {
                index,
                url: link.url.clone(),
                title: link.title.clone(),
            })
            .await;

            match self.process_link(link, output_dir, force, &mut allocator).await {
                Ok(Outcome::Downloaded { path, bytes }) => {
                    info!("Saved {} ({} bytes)", path.display(), bytes);
                    result.downloaded += 1;
                    result.files.push(path.clone());
                    self.emit(DownloadEvent::Completed {
                        url: link.url.clone(),
                        path,
                        bytes,
                    })
                    .await;
                }
                Ok(Outcome::Skipped { reason, existing }) => {
                    info!(
                        "Skipping '{}': duplicate by {} of {}",
                        link.title, reason, existing
                    );
                    result.skipped += 1;
                    self.emit(DownloadEvent::Skipped {
                        url: link.url.clone(),
                        reason,
                        existing,
                    })
                    .await;
                }
                Err(e) if e.is_per_item() => {
                    error!("{}", e);
                    let diagnostic = if matches!(e, ProspektError::Fetch { .. }) {
                        self.capture_diagnostic(output_dir).await
                    } else {
                        None
                    };
                    result.failed += 1;
                    self.emit(DownloadEvent::Failed {
                        url: link.url.clone(),
                        error: e.to_string(),
                        diagnostic,
                    })
                    .await;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Finished: {} downloaded, {} skipped, {} failed",
            result.downloaded, result.skipped, result.failed
        );
        Ok(result)
    }

    async fn process_link(
        &mut self,
        link: &FlyerLink,
        output_dir: &Path,
        force: bool,
        allocator: &mut FilenameAllocator,
    ) -> Result<Outcome> {
        let descriptor = self.parser.parse(&link.title, &link.url);
        if descriptor.is_empty() {
            debug!("Nothing inferred from '{}', matching by URL and hash only", link.title);
        } else {
            debug!("{} -> {:?}", link.url, descriptor);
        }

        if !force {
            if let Some(outcome) = self.check_duplicate(&link.url, &descriptor, None) {
                return Ok(outcome);
            }
        }

        let pdf_url = self.resolve_pdf_url(&link.url).await?;
        let fetched = self.fetcher.fetch_pdf(&pdf_url).await?;

        if !looks_like_pdf(&fetched.bytes) {
            warn!(
                "{} does not look like a PDF (content-type: {}), saving anyway",
                pdf_url,
                fetched.content_type.as_deref().unwrap_or("unknown")
            );
        }

        let content_hash = FlyerRecord::compute_hash(&fetched.bytes);

        if !force {
            if let Some(outcome) =
                self.check_duplicate(&link.url, &descriptor, Some(&content_hash))
            {
                return Ok(outcome);
            }
        }

        let filename = allocator.allocate(&build_filename(&self.config.store_name, &descriptor));
        let filepath = output_dir.join(&filename);
        let file_size = fetched.bytes.len() as u64;
        let target = filepath.clone();
        let bytes = fetched.bytes;
        tokio::task::spawn_blocking(move || write_flyer(&target, &bytes))
            .await
            .map_err(std::io::Error::other)
            .and_then(|written| written)
            .map_err(|source| ProspektError::Write {
                path: filepath.clone(),
                source,
            })?;

        let record = FlyerRecord {
            url: link.url.clone(),
            pdf_url: (pdf_url != link.url).then_some(pdf_url),
            title: link.title.clone(),
            filename,
            filepath: filepath.clone(),
            content_hash,
            file_size,
            downloaded_at: Utc::now(),
            descriptor,
        };
        self.store.append(record)?;

        Ok(Outcome::Downloaded {
            path: filepath,
            bytes: file_size,
        })
    }

    fn check_duplicate(
        &self,
        url: &str,
        descriptor: &FlyerDescriptor,
        content_hash: Option<&str>,
    ) -> Option<Outcome> {
        find_duplicate(url, descriptor, content_hash, self.store.records()).map(|m| {
            Outcome::Skipped {
                reason: m.reason,
                existing: m.record.filename.clone(),
            }
        })
    }

    /// Links straight to a PDF are used as-is. Viewer pages are rendered and
    /// searched for the PDF asset, then inside an embedded viewer frame, then
    /// after pressing the page's download button.
    async fn resolve_pdf_url(&mut self, url: &str) -> Result<String> {
        if is_pdf_url(url) {
            return Ok(url.to_string());
        }

        let html = self.provider.render(url).await?;
        if let Some((pdf_url, source)) = find_pdf_url(&html, url) {
            debug!("PDF for {} found via {:?}", url, source);
            return Ok(pdf_url);
        }

        if let Some(frame_url) = find_viewer_frame(&html, url) {
            match self.provider.render(&frame_url).await {
                Ok(frame_html) => {
                    if let Some((pdf_url, source)) = find_pdf_url(&frame_html, &frame_url) {
                        debug!("PDF for {} found in viewer frame via {:?}", url, source);
                        return Ok(pdf_url);
                    }
                }
                Err(e) => warn!("Viewer frame {} failed to load: {}", frame_url, e),
            }
        }

        if let Some(clicked) = self.provider.click_download(url).await? {
            if let Some((pdf_url, _)) = find_pdf_url(&clicked, url) {
                debug!("PDF for {} revealed by download button", url);
                return Ok(pdf_url);
            }
        }

        Err(ProspektError::fetch(url, "no PDF reference on flyer page"))
    }

    async fn capture_diagnostic(&mut self, output_dir: &Path) -> Option<PathBuf> {
        match self.provider.capture_diagnostic(output_dir).await {
            Ok(Some(path)) => {
                info!("Saved diagnostic snapshot to {}", path.display());
                Some(path)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not capture diagnostic snapshot: {}", e);
                None
            }
        }
    }

    async fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Write through a temporary file in the target directory, so a failed write
/// never leaves a truncated flyer under its final name.
fn write_flyer(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Sniff the leading bytes for a PDF signature.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    infer::get(bytes).is_some_and(|t| t.mime_type() == "application/pdf")
}
