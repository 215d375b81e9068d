//! Operation dispatcher: `run_shell`/`run_copy_to`/`run_copy_from` on top of
//! an established [`MasterEntry`], grounded directly on the original
//! factory's methods of the same names.

use shellmux_core::ShellMuxError;

use crate::{dialog, registry::MasterEntry, templates};

/// Tail length (bytes) included in copy-failure error messages, matching the
/// original's `cache[-256:]`.
const FAILURE_TAIL_BYTES: usize = 256;

/// Spawns a slave PTY sharing `entry`'s control socket, drives it to a ready
/// shell prompt, and returns it for the caller's interactive use.
pub fn run_shell(entry: &MasterEntry) -> Result<shellmux_pty::PtyProcess, ShellMuxError> {
    let (program, args, env) = templates::shell_command(&entry.profile);
    let slave =
        shellmux_pty::PtyProcess::spawn(&program, &args, &env).map_err(|err| err.classify())?;
    dialog::run_dialog(
        &slave,
        &entry.profile.password,
        &entry.profile.cert_passwords,
    )?;
    Ok(slave)
}

/// Copies `src` (local) to `tgt` (remote), per the transport's copy-to
/// template and batch script.
pub fn run_copy_to(
    entry: &MasterEntry,
    src: &str,
    tgt: &str,
    cp_flags: &str,
) -> Result<(), ShellMuxError> {
    run_copy(entry, src, tgt, cp_flags, templates::copy_to_batch)
}

/// Copies `src` (remote) to `tgt` (local), per the transport's copy-from
/// template and batch script.
pub fn run_copy_from(
    entry: &MasterEntry,
    src: &str,
    tgt: &str,
    cp_flags: &str,
) -> Result<(), ShellMuxError> {
    run_copy(entry, src, tgt, cp_flags, templates::copy_from_batch)
}

fn run_copy(
    entry: &MasterEntry,
    src: &str,
    tgt: &str,
    cp_flags: &str,
    batch: fn(&crate::profile::MasterProfile, &str, &str, &str) -> String,
) -> Result<(), ShellMuxError> {
    let (program, args, env) = templates::copy_command(&entry.profile);
    let slave =
        shellmux_pty::PtyProcess::spawn(&program, &args, &env).map_err(|err| err.classify())?;
    dialog::run_dialog(
        &slave,
        &entry.profile.password,
        &entry.profile.cert_passwords,
    )?;

    let script = batch(&entry.profile, src, tgt, cp_flags);
    slave
        .write(script.as_bytes())
        .map_err(|err| err.classify())?;
    let exit_code = slave.wait().map_err(|err| err.classify())?;

    if exit_code != 0 {
        let tail = slave.cache_tail(FAILURE_TAIL_BYTES);
        return Err(ShellMuxError::no_success(format!(
            "file copy failed: {}",
            String::from_utf8_lossy(&tail)
        )));
    }

    tracing::debug!("copy done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MasterRegistry;
    use shellmux_core::Session;
    use std::io::Write as _;
    use tempfile::tempdir;
    use url::Url;

    #[tokio::test]
    async fn run_shell_reaches_interactive_prompt() {
        let registry = MasterRegistry::new();
        let url = Url::parse("sh://localhost/").unwrap();
        let entry = registry.get(&url, &Session::new()).await.unwrap();

        let slave = run_shell(&entry).expect("slave shell should dialog-initialize");
        assert!(slave.alive(false));
        slave.write(b"exit\n").ok();
        slave.wait().ok();
    }

    #[tokio::test]
    async fn run_copy_to_moves_a_local_file() {
        let dir = tempdir().unwrap();
        let src_path = dir.path().join("source.txt");
        let tgt_path = dir.path().join("target.txt");
        let mut src_file = std::fs::File::create(&src_path).unwrap();
        src_file.write_all(b"payload").unwrap();

        let registry = MasterRegistry::new();
        let url = Url::parse("sh://localhost/").unwrap();
        let entry = registry.get(&url, &Session::new()).await.unwrap();

        run_copy_to(
            &entry,
            src_path.to_str().unwrap(),
            tgt_path.to_str().unwrap(),
            "",
        )
        .expect("local copy should succeed");

        assert_eq!(std::fs::read_to_string(&tgt_path).unwrap(), "payload");
    }

    #[tokio::test]
    async fn run_copy_to_reports_nonzero_exit_with_tail() {
        let registry = MasterRegistry::new();
        let url = Url::parse("sh://localhost/").unwrap();
        let entry = registry.get(&url, &Session::new()).await.unwrap();

        let err = run_copy_to(&entry, "/no/such/source", "/no/such/target", "")
            .expect_err("missing source should fail");
        assert_eq!(err.code, shellmux_core::ErrorCode::NoSuccess);
        assert!(err.message.starts_with("file copy failed:"));
    }
}
