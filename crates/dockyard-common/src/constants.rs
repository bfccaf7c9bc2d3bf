//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Dockyard data when running as root.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/dockyard";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "DOCKYARD_DATA_DIR";

/// Returns the data directory, preferring `$DOCKYARD_DATA_DIR`, then
/// `$HOME/.dockyard`, falling back to `/var/lib/dockyard`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".dockyard");
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Directory (relative to the data dir) holding container records.
pub const CONTAINERS_DIR: &str = "containers";
/// Directory (relative to the data dir) holding image records.
pub const GRAPH_DIR: &str = "graph";
/// File name of a persisted container record.
pub const CONTAINER_CONFIG_FILE: &str = "config.json";
/// File name of a persisted host configuration.
pub const HOST_CONFIG_FILE: &str = "hostconfig.json";
/// File name of a persisted image record.
pub const IMAGE_JSON_FILE: &str = "json";
/// File name of the repository/tag index.
pub const REPOSITORIES_FILE: &str = "repositories.json";
/// File name of the optional configuration file inside the data dir.
pub const CONFIG_FILE: &str = "dockyard.json";

/// Length of the abbreviated identifier shown in listings.
pub const SHORT_ID_LENGTH: usize = 12;

/// Upper bound on parent links followed when walking an image ancestry.
pub const MAX_IMAGE_DEPTH: usize = 127;

/// Protocol assumed when a legacy port spec omits one.
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Storage driver reported when none is configured.
pub const DEFAULT_DRIVER: &str = "vfs";

/// Default registry index advertised by `info`.
pub const DEFAULT_INDEX_SERVER: &str = "https://index.docker.io/v1/";

/// Application name used in CLI output.
pub const APP_NAME: &str = "dockyard";
