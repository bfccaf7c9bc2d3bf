//! A container's life as seen through the record store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use dockyard_common::types::{ContainerId, ImageId};
use dockyard_model::api::{APIImages, virtual_size};
use dockyard_model::cell::ContainerCell;
use dockyard_model::config::Config;
use dockyard_model::container::ContainerBuilder;
use dockyard_model::image::ImageBuilder;
use dockyard_model::network::NetworkSettings;
use dockyard_model::port::{Port, PortBinding};
use dockyard_store::repositories::Repositories;
use dockyard_store::store::RecordStore;

#[test]
fn container_state_survives_restart_as_ghost() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RecordStore::open(dir.path()).expect("open");

    let container = ContainerBuilder::new(
        Config::new("redis", vec!["redis-server".into()]),
        ImageId::new("redis-image"),
    )
    .id(ContainerId::new("c0ffee"))
    .volume("/data", "/var/lib/dockyard/volumes/1", false)
    .build()
    .expect("container");
    store.save_container(&container).expect("save created");

    let cell = ContainerCell::new(container);
    let started = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time");
    let mut settings = NetworkSettings::default();
    settings.ip_address = "172.17.0.3".into();
    let _ = settings
        .ports
        .insert(Port::tcp(6379), vec![PortBinding::published(6379)]);
    cell.update(|c| c.start(100, settings, started)).expect("start");
    store
        .save_container(&cell.snapshot().expect("snapshot"))
        .expect("save running");

    // Daemon restart: every running container comes back unverified.
    let mut restored = store.load_container(cell.id()).expect("load");
    restored.state_mut().mark_ghost().expect("ghost");
    store.save_container(&restored).expect("save ghost");

    let reloaded = store.load_container(cell.id()).expect("reload");
    assert!(reloaded.state().is_ghost());
    assert!(reloaded.state().is_running());
    assert_eq!(reloaded.state().pid(), Some(100));
    assert!(!reloaded.is_volume_writable("/data"));
    assert_eq!(
        reloaded.network_settings().bindings_for(&Port::tcp(6379))[0].host_port,
        "6379"
    );
}

#[test]
fn committed_images_report_virtual_size_and_tags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RecordStore::open(dir.path()).expect("open");

    let base = ImageBuilder::new()
        .id(ImageId::new("base"))
        .size(1000)
        .build()
        .expect("base");
    store.save_image(&base).expect("save base");

    let builder = ContainerBuilder::new(
        Config::new("base", vec!["apt-get".into(), "install".into(), "curl".into()]),
        ImageId::new("base"),
    )
    .build()
    .expect("builder container");
    let child = ImageBuilder::commit(&builder)
        .id(ImageId::new("child"))
        .size(250)
        .build()
        .expect("child");
    store.save_image(&child).expect("save child");

    let mut repos = Repositories::load(dir.path()).expect("repos");
    repos.tag("tools", "latest", child.id()).expect("tag");
    repos.save().expect("save repos");

    let reloaded = store.load_image(child.id()).expect("load child");
    let total = virtual_size(&reloaded, |id| store.load_image(id).ok());
    let repos = Repositories::load(dir.path()).expect("reload repos");
    let row = APIImages::project(&reloaded, repos.tags_for(reloaded.id()), total);

    assert_eq!(row.virtual_size, 1250);
    assert_eq!(row.size, 250);
    assert_eq!(row.parent_id, "base");
    assert_eq!(row.repo_tags, vec!["tools:latest"]);
}
