//! Whole-site static export.

use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::application::error::AppError;
use crate::application::feed::FeedService;
use crate::application::repos::ContentRepo;
use crate::infra::{assets, error::InfraError};
use crate::presentation::views::{self, LayoutChrome};

/// Render the listing and every known post into `out_dir` as static HTML,
/// mirroring what `serve` holds in memory. Any missing or malformed
/// document aborts the export.
pub async fn export_site(
    feed: &FeedService,
    content: &dyn ContentRepo,
    chrome: &LayoutChrome,
    out_dir: &Path,
) -> Result<usize, AppError> {
    fs::create_dir_all(out_dir)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    let feed_html = views::render_feed_page(chrome, feed.feed_context().await?)?;
    fs::write(out_dir.join("index.html"), feed_html)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    let uids = content.list_post_uids().await?;
    for uid in &uids {
        let Some(context) = feed.post_detail(uid).await? else {
            return Err(AppError::unexpected(format!(
                "post `{uid}` disappeared between listing and export"
            )));
        };
        let html = views::render_post_page(chrome, context)?;

        let post_dir = out_dir.join("posts").join(uid);
        fs::create_dir_all(&post_dir)
            .await
            .map_err(|err| AppError::from(InfraError::Io(err)))?;
        fs::write(post_dir.join("index.html"), html)
            .await
            .map_err(|err| AppError::from(InfraError::Io(err)))?;
        info!(target: "stellato::export", uid = %uid, "Exported post");
    }

    assets::export_static(out_dir).map_err(|err| AppError::from(InfraError::Io(err)))?;

    Ok(uids.len())
}
