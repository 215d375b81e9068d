//! The PTY shell factory: a process-wide connection multiplexer that
//! classifies a target URL and session into a master profile, maintains a
//! registry of long-lived master connections, spawns cheap slave connections
//! for shell and copy operations, and drives every spawned PTY through an
//! authentication/prompt dialog before handing it back to the caller.

pub mod classifier;
pub mod dialog;
pub mod dispatcher;
pub mod profile;
pub mod registry;
pub mod templates;

use std::sync::OnceLock;

use shellmux_core::{Session, ShellMuxError};
use url::Url;

pub use profile::MasterProfile;
pub use registry::{MasterEntry, MasterRegistry};

/// The process-wide registry shared by every caller of [`shell`],
/// [`copy_to`], and [`copy_from`]. Declared a singleton in the design the
/// same way the original factory is; realized here as a lazily initialized
/// shared instance rather than global mutable data accessed lock-free.
fn registry() -> &'static MasterRegistry {
    static REGISTRY: OnceLock<MasterRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MasterRegistry::new)
}

/// Obtains (creating or reviving as needed) the master connection for
/// `url`/`session`, then spawns and dialog-initializes a slave PTY for
/// interactive use. The caller owns the returned PTY's lifecycle.
pub async fn shell(
    url: &Url,
    session: &Session,
) -> Result<shellmux_pty::PtyProcess, ShellMuxError> {
    let entry = registry().get(url, session).await?;
    dispatcher::run_shell(&entry)
}

/// Copies `src` (local) to `tgt` (remote path relative to `url`'s host),
/// reusing or creating the master connection for `url`/`session`.
pub async fn copy_to(
    url: &Url,
    session: &Session,
    src: &str,
    tgt: &str,
    cp_flags: &str,
) -> Result<(), ShellMuxError> {
    let entry = registry().get(url, session).await?;
    dispatcher::run_copy_to(&entry, src, tgt, cp_flags)
}

/// Copies `src` (remote path relative to `url`'s host) to `tgt` (local),
/// reusing or creating the master connection for `url`/`session`.
pub async fn copy_from(
    url: &Url,
    session: &Session,
    src: &str,
    tgt: &str,
    cp_flags: &str,
) -> Result<(), ShellMuxError> {
    let entry = registry().get(url, session).await?;
    dispatcher::run_copy_from(&entry, src, tgt, cp_flags)
}
