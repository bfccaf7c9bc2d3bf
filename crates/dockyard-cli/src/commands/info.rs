//! `dockyard info`: daemon-wide information.

use std::io::Write;
use std::path::Path;

use clap::Args;
use dockyard_model::api::{APIInfo, RuntimeCounters};

use super::Context;
use crate::output::write_json;

/// Arguments for the `info` command.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

/// Executes the `info` command.
///
/// # Errors
///
/// Returns an error if the records cannot be read or output fails.
pub fn execute(ctx: &Context, _args: &InfoArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let info = collect(ctx)?;
    if ctx.json {
        return write_json(out, &info);
    }

    writeln!(out, "Containers: {}", info.containers)?;
    writeln!(out, "Images: {}", info.images)?;
    if !info.driver.is_empty() {
        writeln!(out, "Storage Driver: {}", info.driver)?;
        for [key, value] in &info.driver_status {
            writeln!(out, " {key}: {value}")?;
        }
    }
    if info.debug {
        writeln!(out, "Debug mode: {}", info.debug)?;
        writeln!(out, "Fds: {}", info.n_fd)?;
        writeln!(out, "Tasks: {}", info.n_goroutines)?;
        writeln!(out, "LXC Version: {}", info.lxc_version)?;
        writeln!(out, "EventsListeners: {}", info.n_events_listener)?;
        writeln!(out, "Kernel Version: {}", info.kernel_version)?;
    }
    if !info.index_server_address.is_empty() {
        writeln!(out, "Index Server Address: {}", info.index_server_address)?;
    }
    if !info.memory_limit {
        writeln!(out, "WARNING: No memory limit support")?;
    }
    if !info.swap_limit {
        writeln!(out, "WARNING: No swap limit support")?;
    }
    if !info.ipv4_forwarding {
        writeln!(out, "WARNING: IPv4 forwarding is disabled")?;
    }
    Ok(())
}

/// Builds the summary from the store and the running process.
///
/// # Errors
///
/// Returns an error if the records cannot be listed.
pub fn collect(ctx: &Context) -> anyhow::Result<APIInfo> {
    let containers = ctx.store.list_containers()?.len();
    let images = ctx.store.list_images()?.len();
    let driver_root = ctx.store.root().join(&ctx.config.driver);
    let counters = RuntimeCounters {
        open_files: count_entries(Path::new("/proc/self/fd")),
        tasks: count_entries(Path::new("/proc/self/task")),
        event_listeners: 0,
        driver_status: vec![
            ["Root Dir".to_string(), driver_root.display().to_string()],
            ["Dirs".to_string(), images.to_string()],
        ],
    };
    Ok(APIInfo::project(containers, images, &ctx.config, &counters))
}

/// Number of entries in a directory, 0 where it does not exist.
fn count_entries(dir: &Path) -> i64 {
    std::fs::read_dir(dir).map_or(0, |entries| {
        i64::try_from(entries.count()).unwrap_or(i64::MAX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{fixture, text};

    #[test]
    fn counts_records() {
        let (_dir, ctx) = fixture();
        let info = collect(&ctx).expect("info");
        assert_eq!(info.containers, 2);
        assert_eq!(info.images, 1);
        assert_eq!(info.driver, "vfs");
        assert_eq!(info.driver_status[1], ["Dirs".to_string(), "1".to_string()]);
    }

    #[test]
    fn text_output_warns_about_missing_capabilities() {
        let (_dir, ctx) = fixture();
        let mut out = Vec::new();
        execute(&ctx, &InfoArgs::default(), &mut out).expect("info");
        let text = text(out);
        assert!(text.starts_with("Containers: 2\nImages: 1\nStorage Driver: vfs\n"));
        assert!(text.contains("WARNING: No memory limit support"));
        assert!(!text.contains("Debug mode"));
    }

    #[test]
    fn json_output_omits_unset_capabilities() {
        let (_dir, mut ctx) = fixture();
        ctx.json = true;
        ctx.config.host.swap_limit = true;
        let mut out = Vec::new();
        execute(&ctx, &InfoArgs::default(), &mut out).expect("info");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["Containers"], 2);
        assert_eq!(value["SwapLimit"], true);
        assert!(value.get("MemoryLimit").is_none());
        assert!(value.get("NEventsListener").is_none());
    }
}
