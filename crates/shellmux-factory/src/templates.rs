//! Command template table (crate's external-interface §6): renders a
//! [`MasterProfile`] into the concrete `(program, args, env)` triple
//! `shellmux-pty` spawns, and the batch scripts written to slave PTYs for
//! copy operations.

use std::collections::BTreeMap;

use shellmux_core::TransportType;

use crate::profile::MasterProfile;

type Rendered = (String, Vec<String>, BTreeMap<String, String>);

/// `<ssh_env> <ssh_exe> <ssh_args> <master_flags> <host_str>` (secure-shell),
/// or `<sh_env> <sh_exe> <sh_args>` (local).
pub fn master_command(profile: &MasterProfile) -> Rendered {
    match profile.transport {
        TransportType::Local => local_shell_command(profile),
        TransportType::SecureShell | TransportType::GsiSecureShell => {
            secure_shell_command(profile, &profile.master_flags)
        }
    }
}

/// `<ssh_env> <ssh_exe> <ssh_args> <slave_flags> <host_str>` (secure-shell),
/// or `<sh_env> <sh_exe> <sh_args>` (local).
pub fn shell_command(profile: &MasterProfile) -> Rendered {
    match profile.transport {
        TransportType::Local => local_shell_command(profile),
        TransportType::SecureShell | TransportType::GsiSecureShell => {
            secure_shell_command(profile, &profile.slave_flags)
        }
    }
}

/// `<sftp_env> <sftp_exe> <sftp_args> <slave_flags> <host_str>` (secure-shell),
/// or the local shell (the batch script does the actual copying for local).
pub fn copy_command(profile: &MasterProfile) -> Rendered {
    match profile.transport {
        TransportType::Local => local_shell_command(profile),
        TransportType::SecureShell | TransportType::GsiSecureShell => {
            let mut args = profile.transfer_args.clone();
            args.extend(profile.slave_flags.iter().cloned());
            args.push(profile.host_str.clone());
            (
                profile.transfer_exe.clone(),
                args,
                profile.transfer_env.clone(),
            )
        }
    }
}

/// `progress\n put <cp_flags> <src> <tgt>\n exit\n` (secure-shell), or
/// `cd ~ && exec <cp_exe> <cp_flags> <src> <tgt>` (local).
pub fn copy_to_batch(profile: &MasterProfile, src: &str, tgt: &str, cp_flags: &str) -> String {
    match profile.transport {
        TransportType::Local => local_copy_batch(profile, src, tgt, cp_flags),
        TransportType::SecureShell | TransportType::GsiSecureShell => {
            format!("progress\n put {cp_flags} {src} {tgt}\n exit\n")
        }
    }
}

/// `progress\n get <cp_flags> <src> <tgt>\n exit\n` (secure-shell), or
/// `cd ~ && exec <cp_exe> <cp_flags> <src> <tgt>` (local).
pub fn copy_from_batch(profile: &MasterProfile, src: &str, tgt: &str, cp_flags: &str) -> String {
    match profile.transport {
        TransportType::Local => local_copy_batch(profile, src, tgt, cp_flags),
        TransportType::SecureShell | TransportType::GsiSecureShell => {
            format!("progress\n get {cp_flags} {src} {tgt}\n exit\n")
        }
    }
}

fn secure_shell_command(profile: &MasterProfile, flags: &[String]) -> Rendered {
    let mut args = profile.shell_args.clone();
    args.extend(flags.iter().cloned());
    args.push(profile.host_str.clone());
    (profile.shell_exe.clone(), args, profile.shell_env.clone())
}

fn local_shell_command(profile: &MasterProfile) -> Rendered {
    (
        profile.shell_exe.clone(),
        profile.shell_args.clone(),
        profile.shell_env.clone(),
    )
}

fn local_copy_batch(profile: &MasterProfile, src: &str, tgt: &str, cp_flags: &str) -> String {
    if cp_flags.is_empty() {
        format!("cd ~ && exec {} {src} {tgt}\n", profile.copy_exe)
    } else {
        format!("cd ~ && exec {} {cp_flags} {src} {tgt}\n", profile.copy_exe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellmux_core::Session;
    use url::Url;

    #[test]
    fn secure_shell_master_command_includes_master_flags_and_host() {
        let profile = crate::profile::build_profile(
            &Url::parse("ssh://alice@example.com/").unwrap(),
            &Session::new(),
        )
        .unwrap();
        let (program, args, env) = master_command(&profile);
        assert!(program.ends_with("ssh"));
        assert!(args.contains(&"ControlMaster=yes".to_string()));
        assert!(args.contains(&"alice@example.com".to_string()));
        assert_eq!(env.get("TERM").map(String::as_str), Some("vt100"));
    }

    #[test]
    fn secure_shell_copy_command_uses_transfer_exe_and_slave_flags() {
        let profile = crate::profile::build_profile(
            &Url::parse("ssh://alice@example.com/").unwrap(),
            &Session::new(),
        )
        .unwrap();
        let (program, args, _env) = copy_command(&profile);
        assert!(program.ends_with("sftp"));
        assert!(args.contains(&"ControlMaster=no".to_string()));
    }

    #[test]
    fn local_copy_batch_renders_cd_and_exec() {
        let profile =
            crate::profile::build_profile(&Url::parse("sh://localhost/").unwrap(), &Session::new())
                .unwrap();
        let batch = copy_to_batch(&profile, "/tmp/a", "/tmp/b", "");
        assert!(batch.starts_with("cd ~ && exec"));
        assert!(batch.contains("/tmp/a /tmp/b"));
    }

    #[test]
    fn secure_shell_copy_batches_use_put_and_get() {
        let profile = crate::profile::build_profile(
            &Url::parse("ssh://alice@example.com/").unwrap(),
            &Session::new(),
        )
        .unwrap();
        assert!(copy_to_batch(&profile, "a", "b", "-r").contains("put -r a b"));
        assert!(copy_from_batch(&profile, "a", "b", "-r").contains("get -r a b"));
    }
}
