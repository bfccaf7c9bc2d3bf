//! Shared, consistently observable container record.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dockyard_common::error::{DockyardError, Result};
use dockyard_common::types::ContainerId;

use crate::container::Container;

/// A container owned by one writer and read by many.
///
/// Each update runs against a copy of the record and is committed only if it
/// succeeds, so readers see either the old or the new record and never a
/// half-applied transition.
#[derive(Debug)]
pub struct ContainerCell {
    id: ContainerId,
    inner: RwLock<Container>,
}

impl ContainerCell {
    /// Wraps a container record.
    #[must_use]
    pub fn new(container: Container) -> Self {
        Self {
            id: container.id().clone(),
            inner: RwLock::new(container),
        }
    }

    /// Identity of the wrapped container.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Returns a consistent copy of the record.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Config`] if the lock is poisoned.
    pub fn snapshot(&self) -> Result<Container> {
        Ok(self.read()?.clone())
    }

    /// Applies `change` to a copy and commits it on success.
    ///
    /// The configuration is shared between the copy and the committed record,
    /// so only state and network settings are actually duplicated.
    ///
    /// # Errors
    ///
    /// Returns whatever `change` returns, leaving the record untouched, or
    /// [`DockyardError::Config`] if the lock is poisoned.
    pub fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Container) -> Result<T>,
    {
        let mut guard = self.write()?;
        let mut draft = guard.clone();
        let out = change(&mut draft)?;
        *guard = draft;
        tracing::debug!(id = %self.id, state = %guard.state().lifecycle(), "container record committed");
        Ok(out)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Container>> {
        self.inner.read().map_err(|_| self.poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Container>> {
        self.inner.write().map_err(|_| self.poisoned())
    }

    fn poisoned(&self) -> DockyardError {
        DockyardError::Config {
            message: format!("container {} lock poisoned", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use dockyard_common::types::ImageId;

    use super::*;
    use crate::config::Config;
    use crate::container::ContainerBuilder;
    use crate::network::NetworkSettings;

    fn cell() -> ContainerCell {
        let container = ContainerBuilder::new(Config::new("busybox", vec!["sh".into()]), ImageId::new("img"))
            .id(ContainerId::new("c1"))
            .build()
            .expect("container");
        ContainerCell::new(container)
    }

    #[test]
    fn successful_update_is_committed() {
        let cell = cell();
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("time");
        cell.update(|c| c.start(7, NetworkSettings::default(), at))
            .expect("start");
        let snap = cell.snapshot().expect("snapshot");
        assert!(snap.state().is_running());
        assert_eq!(snap.state().pid(), Some(7));
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let cell = cell();
        let before = cell.snapshot().expect("snapshot");
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("time");
        let err = cell.update(|c| c.exit(1, at)).expect_err("created cannot exit");
        assert!(matches!(err, DockyardError::InvalidTransition { .. }));
        assert_eq!(cell.snapshot().expect("snapshot"), before);
    }

    #[test]
    fn partial_change_is_discarded_on_error() {
        let cell = cell();
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("time");
        let result: Result<()> = cell.update(|c| {
            c.start(9, NetworkSettings::default(), at)?;
            c.state_mut().confirm_running()
        });
        assert!(result.is_err());
        assert!(!cell.snapshot().expect("snapshot").state().is_running());
    }

    #[test]
    fn config_is_shared_with_committed_record() {
        let cell = cell();
        let before = cell.snapshot().expect("snapshot");
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("time");
        cell.update(|c| c.start(3, NetworkSettings::default(), at))
            .expect("start");
        let after = cell.snapshot().expect("snapshot");
        assert!(Arc::ptr_eq(before.config(), after.config()));
    }
}
