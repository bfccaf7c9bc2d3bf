//! `dockyard inspect`: print full records.

use std::io::Write;

use anyhow::bail;
use clap::Args;
use dockyard_common::error::DockyardError;
use dockyard_common::types::ImageId;
use dockyard_model::image::Image;
use serde_json::Value;

use super::Context;
use crate::output::write_json;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Container (ID, name or ID prefix) or image (ID or ID prefix).
    #[arg(required = true)]
    pub targets: Vec<String>,
}

/// Executes the `inspect` command.
///
/// Prints a JSON array with one record per target. Containers include their
/// host configuration under `HostConfig`.
///
/// # Errors
///
/// Returns an error if any target matches neither a container nor an image.
pub fn execute(ctx: &Context, args: &InspectArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let records = args
        .targets
        .iter()
        .map(|target| resolve(ctx, target))
        .collect::<anyhow::Result<Vec<_>>>()?;
    write_json(out, &records)
}

fn resolve(ctx: &Context, target: &str) -> anyhow::Result<Value> {
    match ctx.store.find_container(target) {
        Ok(container) => {
            let host = ctx.store.load_host_config(container.id())?;
            let mut value = serde_json::to_value(&container)?;
            if let Value::Object(fields) = &mut value {
                let _ = fields.insert("HostConfig".to_string(), serde_json::to_value(&host)?);
            }
            Ok(value)
        }
        Err(DockyardError::NotFound { .. }) => Ok(serde_json::to_value(find_image(ctx, target)?)?),
        Err(e) => Err(e.into()),
    }
}

fn find_image(ctx: &Context, target: &str) -> anyhow::Result<Image> {
    match ctx.store.load_image(&ImageId::new(target)) {
        Ok(image) => return Ok(image),
        Err(DockyardError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }
    let mut matches = ctx
        .store
        .list_images()?
        .into_iter()
        .filter(|image| !target.is_empty() && image.id().as_str().starts_with(target));
    match (matches.next(), matches.next()) {
        (Some(image), None) => Ok(image),
        (Some(_), Some(_)) => Err(DockyardError::Ambiguous {
            kind: "image",
            prefix: target.to_string(),
        }
        .into()),
        (None, _) => bail!("no such container or image: {target}"),
    }
}

#[cfg(test)]
mod tests {
    use dockyard_common::types::ContainerId;
    use dockyard_model::host_config::HostConfig;

    use super::*;
    use crate::commands::testing::{BASE_IMAGE, WEB_ID, fixture};

    fn inspect(ctx: &Context, targets: &[&str]) -> anyhow::Result<Value> {
        let args = InspectArgs {
            targets: targets.iter().map(ToString::to_string).collect(),
        };
        let mut out = Vec::new();
        execute(ctx, &args, &mut out)?;
        Ok(serde_json::from_slice(&out)?)
    }

    #[test]
    fn container_by_name_includes_host_config() {
        let (_dir, ctx) = fixture();
        let host = HostConfig {
            privileged: true,
            ..HostConfig::default()
        };
        ctx.store
            .save_host_config(&ContainerId::new(WEB_ID), &host)
            .expect("save host");

        let value = inspect(&ctx, &["web"]).expect("inspect");
        let record = &value[0];
        assert_eq!(record["Id"], WEB_ID);
        assert_eq!(record["State"]["Running"], true);
        assert_eq!(record["NetworkSettings"]["Ports"]["80/tcp"][0]["HostPort"], "49153");
        assert_eq!(record["HostConfig"]["Privileged"], true);
        assert!(record["Config"].get("PortSpecs").is_none());
    }

    #[test]
    fn image_by_prefix() {
        let (_dir, ctx) = fixture();
        let value = inspect(&ctx, &["b750fe"]).expect("inspect");
        assert_eq!(value[0]["Id"], BASE_IMAGE);
        assert_eq!(value[0]["Size"], 12_288);
    }

    #[test]
    fn several_targets_in_order() {
        let (_dir, ctx) = fixture();
        let value = inspect(&ctx, &["db", BASE_IMAGE]).expect("inspect");
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[0]["Name"], "/db");
        assert_eq!(value[1]["Id"], BASE_IMAGE);
    }

    #[test]
    fn unknown_target_fails() {
        let (_dir, ctx) = fixture();
        let err = inspect(&ctx, &["nothing-here"]).expect_err("must fail");
        assert!(err.to_string().contains("nothing-here"));
    }
}
