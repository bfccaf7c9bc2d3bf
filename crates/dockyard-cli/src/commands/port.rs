//! `dockyard port`: show the public ports of a container.

use std::io::Write;

use anyhow::bail;
use clap::Args;
use dockyard_common::constants::DEFAULT_PROTOCOL;
use dockyard_model::port::{Port, PortBinding};

use super::Context;
use crate::output::write_json;

/// Arguments for the `port` command.
#[derive(Args, Debug)]
pub struct PortArgs {
    /// Container ID, name or ID prefix.
    pub container: String,

    /// Private port, as `PORT` or `PORT/PROTO` (protocol defaults to tcp).
    pub private_port: Option<String>,
}

/// Executes the `port` command.
///
/// With a private port, prints each `ip:port` it is published on. Without
/// one, prints every realized binding as `port/proto -> ip:port`.
///
/// # Errors
///
/// Returns an error if the container is unknown, the port is malformed or
/// the requested port is not published.
pub fn execute(ctx: &Context, args: &PortArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let container = ctx.store.find_container(&args.container)?;
    let settings = container.network_settings();

    let Some(requested) = &args.private_port else {
        if ctx.json {
            return write_json(out, &settings.ports);
        }
        for (port, bindings) in &settings.ports {
            for binding in bindings {
                writeln!(out, "{port} -> {}", host_address(binding))?;
            }
        }
        return Ok(());
    };

    let port = parse_private_port(requested)?;
    let bindings = settings.bindings_for(&port);
    if bindings.is_empty() {
        bail!("no public port '{port}' published for {}", container.id().short());
    }
    if ctx.json {
        return write_json(out, bindings);
    }
    for binding in bindings {
        writeln!(out, "{}", host_address(binding))?;
    }
    Ok(())
}

fn parse_private_port(input: &str) -> anyhow::Result<Port> {
    let token = if input.contains('/') {
        input.to_string()
    } else {
        format!("{input}/{DEFAULT_PROTOCOL}")
    };
    Ok(Port::parse(&token)?)
}

fn host_address(binding: &PortBinding) -> String {
    let ip = if binding.host_ip.is_empty() {
        "0.0.0.0"
    } else {
        binding.host_ip.as_str()
    };
    format!("{ip}:{}", binding.host_port)
}
