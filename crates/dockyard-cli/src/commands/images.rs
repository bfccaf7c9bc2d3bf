//! `dockyard images`: list images.

use std::collections::BTreeSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use clap::Args;
use dockyard_common::types::ImageId;
use dockyard_model::api::{APIImages, virtual_size};

use super::Context;
use crate::output::{display_id, format_age, format_size, write_json, write_table};

const NONE: &str = "<none>";

/// Arguments for the `images` command.
#[derive(Args, Debug, Default)]
pub struct ImagesArgs {
    /// Show all images (default hides intermediate images).
    #[arg(short, long)]
    pub all: bool,

    /// Only show numeric IDs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't truncate output.
    #[arg(long)]
    pub no_trunc: bool,
}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if the records cannot be read or output fails.
pub fn execute(ctx: &Context, args: &ImagesArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let rows = list(ctx, args)?;

    if ctx.json {
        return write_json(out, &rows);
    }
    if args.quiet {
        for row in &rows {
            writeln!(out, "{}", display_id(&row.id, args.no_trunc))?;
        }
        return Ok(());
    }

    let now = Utc::now();
    let mut table = Vec::new();
    for row in &rows {
        let created = DateTime::from_timestamp(row.created, 0)
            .map_or_else(String::new, |created| format_age(created, now));
        let id = display_id(&row.id, args.no_trunc).to_string();
        let size = format_size(row.virtual_size);
        if row.repo_tags.is_empty() {
            table.push(vec![NONE.into(), NONE.into(), id, created, size]);
            continue;
        }
        for name in &row.repo_tags {
            let (repository, tag) = name.rsplit_once(':').unwrap_or((name.as_str(), NONE));
            table.push(vec![
                repository.to_string(),
                tag.to_string(),
                id.clone(),
                created.clone(),
                size.clone(),
            ]);
        }
    }
    write_table(out, &["REPOSITORY", "TAG", "IMAGE ID", "CREATED", "VIRTUAL SIZE"], &table)?;
    Ok(())
}

/// Projects the images, newest first.
///
/// Without `--all`, untagged images that are the parent of another image
/// are hidden.
///
/// # Errors
///
/// Returns an error if the records cannot be read.
pub fn list(ctx: &Context, args: &ImagesArgs) -> anyhow::Result<Vec<APIImages>> {
    let repos = ctx.repositories()?;
    let mut images = ctx.store.list_images()?;
    let parents: BTreeSet<ImageId> = images.iter().map(|i| i.parent().clone()).collect();
    images.sort_by(|a, b| b.created().cmp(&a.created()).then_with(|| a.id().cmp(b.id())));

    let mut rows = Vec::new();
    for image in &images {
        let tags = repos.tags_for(image.id());
        if !args.all && tags.is_empty() && parents.contains(image.id()) {
            continue;
        }
        let total = virtual_size(image, |id| ctx.store.load_image(id).ok());
        rows.push(APIImages::project(image, tags, total));
    }
    Ok(rows)
}
