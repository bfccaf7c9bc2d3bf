//! `dockyard ps`: list containers.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use dockyard_model::api::{APIContainers, ContainerListing, virtual_size};
use dockyard_model::container::Container;

use super::Context;
use crate::output::{display_id, format_age, format_ports, format_size, write_json, write_table};

/// Directory inside a container's record directory holding its writable layer.
const RW_LAYER_DIR: &str = "rw";

/// Arguments for the `ps` command.
#[derive(Args, Debug, Default)]
pub struct PsArgs {
    /// Show all containers (default shows just running).
    #[arg(short, long)]
    pub all: bool,

    /// Display total file sizes.
    #[arg(short, long)]
    pub size: bool,

    /// Only display numeric IDs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't truncate output.
    #[arg(long)]
    pub no_trunc: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the records cannot be read or output fails.
pub fn execute(ctx: &Context, args: &PsArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let now = Utc::now();
    let rows = list(ctx, args, now)?;

    if ctx.json {
        return write_json(out, &rows);
    }
    if args.quiet {
        for row in &rows {
            writeln!(out, "{}", display_id(&row.id, args.no_trunc))?;
        }
        return Ok(());
    }

    let mut header = vec!["CONTAINER ID", "IMAGE", "COMMAND", "CREATED", "STATUS", "PORTS", "NAMES"];
    if args.size {
        header.push("SIZE");
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = vec![
                display_id(&row.id, args.no_trunc).to_string(),
                row.image.clone(),
                display_command(&row.command, args.no_trunc),
                DateTime::from_timestamp(row.created, 0).map_or_else(String::new, |created| format_age(created, now)),
                row.status.clone(),
                format_ports(&row.ports),
                row.names.join(","),
            ];
            if args.size {
                cells.push(format!(
                    "{} (virtual {})",
                    format_size(row.size_rw),
                    format_size(row.size_root_fs)
                ));
            }
            cells
        })
        .collect();
    write_table(out, &header, &table)?;
    Ok(())
}

/// Projects the matching containers, newest first.
///
/// # Errors
///
/// Returns an error if the records cannot be read.
pub fn list(ctx: &Context, args: &PsArgs, now: DateTime<Utc>) -> anyhow::Result<Vec<APIContainers>> {
    let repos = ctx.repositories()?;
    let mut containers: Vec<Container> = ctx
        .store
        .list_containers()?
        .into_iter()
        .filter(|c| args.all || c.state().is_running())
        .collect();
    containers.sort_by(|a, b| b.created().cmp(&a.created()).then_with(|| a.id().cmp(b.id())));

    let rows = containers
        .iter()
        .map(|container| {
            let listing = ContainerListing {
                image: repos.tags_for(container.image()).into_iter().next().unwrap_or_default(),
                names: Vec::new(),
                size: args.size.then(|| sizes(ctx, container)),
                now,
            };
            APIContainers::project(container, &listing)
        })
        .collect();
    Ok(rows)
}

/// `(SizeRw, SizeRootFs)`: the writable layer, then that plus the image chain.
fn sizes(ctx: &Context, container: &Container) -> (i64, i64) {
    let rw = dir_size(&ctx.store.container_dir(container.id()).join(RW_LAYER_DIR));
    let image = ctx
        .store
        .load_image(container.image())
        .map(|image| virtual_size(&image, |id| ctx.store.load_image(id).ok()))
        .unwrap_or_else(|e| {
            tracing::warn!(id = %container.id(), error = %e, "image unavailable for size");
            0
        });
    (rw, rw.saturating_add(image))
}

fn dir_size(path: &Path) -> i64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| match entry.file_type() {
            Ok(kind) if kind.is_dir() => dir_size(&entry.path()),
            Ok(_) => entry
                .metadata()
                .map(|m| i64::try_from(m.len()).unwrap_or(i64::MAX))
                .unwrap_or_default(),
            Err(_) => 0,
        })
        .sum()
}

fn display_command(command: &str, full: bool) -> String {
    const MAX: usize = 20;
    if full || command.chars().count() <= MAX {
        format!("\"{command}\"")
    } else {
        let cut: String = command.chars().take(MAX - 3).collect();
        format!("\"{cut}...\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{DB_ID, WEB_ID, at, fixture, text};

    #[test]
    fn default_lists_running_only() {
        let (_dir, ctx) = fixture();
        let rows = list(&ctx, &PsArgs::default(), at(200)).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, WEB_ID);
        assert_eq!(rows[0].image, "base:latest");
        assert_eq!(rows[0].status, "Up About a minute");
        assert_eq!(rows[0].names, vec!["/web"]);
    }

    #[test]
    fn all_includes_exited() {
        let (_dir, ctx) = fixture();
        let args = PsArgs {
            all: true,
            ..PsArgs::default()
        };
        let rows = list(&ctx, &args, at(200)).expect("list");
        assert_eq!(rows.len(), 2);
        let db = rows.iter().find(|r| r.id == DB_ID).expect("db row");
        assert_eq!(db.status, "Exit 1");
        assert!(db.ports.is_empty());
    }

    #[test]
    fn size_includes_image_chain() {
        let (_dir, ctx) = fixture();
        let rw = ctx
            .store
            .container_dir(&dockyard_common::types::ContainerId::new(WEB_ID))
            .join(RW_LAYER_DIR);
        std::fs::create_dir_all(rw.join("etc")).expect("mkdir");
        std::fs::write(rw.join("etc/motd"), vec![0_u8; 100]).expect("write");

        let args = PsArgs {
            size: true,
            ..PsArgs::default()
        };
        let rows = list(&ctx, &args, at(200)).expect("list");
        assert_eq!(rows[0].size_rw, 100);
        assert_eq!(rows[0].size_root_fs, 100 + 12_288);
    }

    #[test]
    fn table_shows_ports_and_quoted_command() {
        let (_dir, ctx) = fixture();
        let mut out = Vec::new();
        execute(&ctx, &PsArgs::default(), &mut out).expect("ps");
        let text = text(out);
        let mut lines = text.lines();
        assert!(lines.next().expect("header").starts_with("CONTAINER ID"));
        let row = lines.next().expect("row");
        assert!(row.starts_with("4fa6e0f0c678 "));
        assert!(row.contains("\"nginx -g daemon off;\""));
        assert!(row.contains("0.0.0.0:49153->80/tcp"));
        assert!(row.ends_with("/web"));
    }

    #[test]
    fn quiet_prints_ids() {
        let (_dir, ctx) = fixture();
        let args = PsArgs {
            all: true,
            quiet: true,
            no_trunc: true,
            ..PsArgs::default()
        };
        let mut out = Vec::new();
        execute(&ctx, &args, &mut out).expect("ps");
        let text = text(out);
        let ids: Vec<&str> = text.lines().collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&WEB_ID));
        assert!(ids.contains(&DB_ID));
    }

    #[test]
    fn json_output_uses_api_field_names() {
        let (_dir, mut ctx) = fixture();
        ctx.json = true;
        let mut out = Vec::new();
        execute(&ctx, &PsArgs::default(), &mut out).expect("ps");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value[0]["Id"], WEB_ID);
        assert_eq!(value[0]["Ports"][0]["PublicPort"], 49153);
        assert_eq!(value[0]["Names"][0], "/web");
    }
}
