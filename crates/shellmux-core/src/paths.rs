use std::{env, path::PathBuf};

/// Resolves the root directory under which per-master control sockets are
/// placed. Overridable for tests; defaults to a per-user directory under
/// `HOME`, mirroring the `~/.saga/adaptors/shell/` layout of the original.
pub fn default_control_root() -> PathBuf {
    if let Some(override_dir) = env::var_os("SHELLMUX_CONTROL_ROOT") {
        return PathBuf::from(override_dir);
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".shellmux/ctrl");
    }

    PathBuf::from(".shellmux/ctrl")
}

/// Resolves the local login shell from `SHELL`, falling back to `/bin/sh`.
pub fn default_local_shell() -> String {
    env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
