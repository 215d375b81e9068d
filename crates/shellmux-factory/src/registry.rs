//! Process-wide master registry: `host -> user -> transport -> MasterEntry`.
//!
//! Grounded on `planterd::worker_manager::WorkerManager`: a `Mutex`-guarded
//! map of live handles, plus a separate map of per-key async locks so that
//! concurrent lookups for the same key serialize around master creation
//! instead of racing to spawn duplicate masters.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use shellmux_core::{Session, ShellMuxError};
use tokio::sync::Mutex as AsyncMutex;
use url::Url;

use crate::{dialog, profile::MasterProfile};

/// A [`MasterProfile`] whose `pty` has completed the dialog and is live.
pub struct MasterEntry {
    pub profile: MasterProfile,
    pub pty: Arc<shellmux_pty::PtyProcess>,
}

type CreateLock = Arc<AsyncMutex<()>>;
/// `host -> user -> transport -> entry`, the registry's three-level map.
type MasterMap = HashMap<String, HashMap<String, HashMap<&'static str, Arc<MasterEntry>>>>;

/// Three-level process-wide map of live master connections, keyed by
/// `(host_str, user, transport)`.
#[derive(Default)]
pub struct MasterRegistry {
    masters: Mutex<MasterMap>,
    create_locks: Mutex<HashMap<String, CreateLock>>,
}

impl MasterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a live master entry for `url`/`session`, creating one on
    /// first use and reviving a dead one on reuse, per the registry's
    /// miss/hit contract.
    pub async fn get(
        &self,
        url: &Url,
        session: &Session,
    ) -> Result<Arc<MasterEntry>, ShellMuxError> {
        let profile = crate::profile::build_profile(url, session)?;
        let (host, user, transport) = profile.registry_key();
        let key = format!("{host}\u{0}{user}\u{0}{transport}");

        let create_lock = self.create_lock(&key)?;
        let _guard = create_lock.lock().await;

        if let Some(entry) = self.lookup(&host, &user, transport)? {
            if entry.pty.alive(true) {
                return Ok(entry);
            }
            tracing::debug!(%host, %user, %transport, "reclaiming dead master");
            self.remove(&host, &user, transport)?;
        }

        tracing::debug!(%host, %user, %transport, "spawning new master");
        let entry = Arc::new(spawn_master(profile)?);
        self.insert(host, user, transport, Arc::clone(&entry))?;
        Ok(entry)
    }

    fn lookup(
        &self,
        host: &str,
        user: &str,
        transport: &'static str,
    ) -> Result<Option<Arc<MasterEntry>>, ShellMuxError> {
        let masters = self.masters_lock()?;
        Ok(masters
            .get(host)
            .and_then(|by_user| by_user.get(user))
            .and_then(|by_transport| by_transport.get(transport))
            .cloned())
    }

    fn insert(
        &self,
        host: String,
        user: String,
        transport: &'static str,
        entry: Arc<MasterEntry>,
    ) -> Result<(), ShellMuxError> {
        self.masters_lock()?
            .entry(host)
            .or_default()
            .entry(user)
            .or_default()
            .insert(transport, entry);
        Ok(())
    }

    fn remove(&self, host: &str, user: &str, transport: &'static str) -> Result<(), ShellMuxError> {
        if let Some(by_user) = self.masters_lock()?.get_mut(host)
            && let Some(by_transport) = by_user.get_mut(user)
        {
            by_transport.remove(transport);
        }
        Ok(())
    }

    fn masters_lock(&self) -> Result<MutexGuard<'_, MasterMap>, ShellMuxError> {
        self.masters
            .lock()
            .map_err(|_| ShellMuxError::no_success("master registry lock poisoned"))
    }

    fn create_lock(&self, key: &str) -> Result<CreateLock, ShellMuxError> {
        let mut locks = self
            .create_locks
            .lock()
            .map_err(|_| ShellMuxError::no_success("master registry create-lock map poisoned"))?;
        if let Some(lock) = locks.get(key) {
            return Ok(Arc::clone(lock));
        }
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::clone(&lock));
        Ok(lock)
    }
}

fn spawn_master(profile: MasterProfile) -> Result<MasterEntry, ShellMuxError> {
    let (program, args, env) = crate::templates::master_command(&profile);

    let pty =
        shellmux_pty::PtyProcess::spawn(&program, &args, &env).map_err(|err| err.classify())?;
    if !pty.alive(false) {
        return Err(ShellMuxError::no_success(format!(
            "Shell not connected to {}",
            profile.host_str
        )));
    }

    dialog::run_dialog(&pty, &profile.password, &profile.cert_passwords)?;

    Ok(MasterEntry {
        profile,
        pty: Arc::new(pty),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellmux_core::Session;

    #[tokio::test]
    async fn creates_and_reuses_local_master() {
        let registry = MasterRegistry::new();
        let url = Url::parse("sh://localhost/").unwrap();
        let session = Session::new();

        let first = registry.get(&url, &session).await.expect("first get");
        let second = registry.get(&url, &session).await.expect("second get");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn reclaims_a_dead_master_instead_of_poisoning_the_key() {
        let registry = MasterRegistry::new();
        let url = Url::parse("sh://localhost/").unwrap();
        let session = Session::new();

        let first = registry.get(&url, &session).await.expect("first get");
        first.pty.kill().ok();
        first.pty.wait().ok();

        let second = registry
            .get(&url, &session)
            .await
            .expect("get after reclamation should recreate the master, not error");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.pty.alive(false));

        let third = registry.get(&url, &session).await.expect("third get");
        assert!(Arc::ptr_eq(&second, &third));
    }
}
