//! Maps a URL schema to a transport family and resolves the concrete
//! executables each family drives for interactive, copy, and transfer work.

use std::path::PathBuf;

use shellmux_core::{ShellMuxError, TransportType};

/// Interactive shell/copy/transfer executables resolved for one transport.
pub struct Executables {
    pub shell: String,
    pub copy: String,
    pub transfer: String,
}

/// Classifies a URL schema into a transport family, failing with
/// `BadParameter` for anything outside the three known schema sets.
pub fn classify_schema(schema: &str) -> Result<TransportType, ShellMuxError> {
    match schema.to_ascii_lowercase().as_str() {
        "sh" | "fork" | "local" | "file" => Ok(TransportType::Local),
        "ssh" | "scp" | "sftp" => Ok(TransportType::SecureShell),
        "gsissh" | "gsiscp" | "gsisftp" | "gsiftp" => Ok(TransportType::GsiSecureShell),
        other => Err(ShellMuxError::bad_parameter(format!(
            "cannot handle schema '{other}://'"
        ))),
    }
}

/// Resolves the executables driven by a transport family.
pub fn resolve_executables(transport: TransportType) -> Result<Executables, ShellMuxError> {
    match transport {
        TransportType::Local => {
            let shell = which(&shellmux_core::paths::default_local_shell())?;
            let copy = which("cp")?;
            Ok(Executables {
                shell,
                transfer: copy.clone(),
                copy,
            })
        }
        TransportType::SecureShell => Ok(Executables {
            shell: which("ssh")?,
            copy: which("scp")?,
            transfer: which("sftp")?,
        }),
        TransportType::GsiSecureShell => Ok(Executables {
            shell: which("gsissh")?,
            copy: which("gsiscp")?,
            transfer: which("gsisftp")?,
        }),
    }
}

/// Resolves `name` against `PATH`, mirroring the original's `which()` lookup.
/// An already-qualified or unresolvable name is passed through unchanged so
/// the downstream spawn attempt reports a clear "no such file" error.
fn which(name: &str) -> Result<String, ShellMuxError> {
    if name.contains('/') {
        return Ok(name.to_string());
    }

    let Some(path_var) = std::env::var_os("PATH") else {
        return Ok(name.to_string());
    };

    for dir in std::env::split_paths(&path_var) {
        let candidate: PathBuf = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate.to_string_lossy().into_owned());
        }
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh_family_schemas_classify_local() {
        for schema in ["sh", "fork", "local", "file", "SH"] {
            assert_eq!(classify_schema(schema).unwrap(), TransportType::Local);
        }
    }

    #[test]
    fn ssh_family_schemas_classify_secure_shell() {
        for schema in ["ssh", "scp", "sftp"] {
            assert_eq!(classify_schema(schema).unwrap(), TransportType::SecureShell);
        }
    }

    #[test]
    fn gsi_family_schemas_classify_gsi_secure_shell() {
        for schema in ["gsissh", "gsiscp", "gsisftp", "gsiftp"] {
            assert_eq!(
                classify_schema(schema).unwrap(),
                TransportType::GsiSecureShell
            );
        }
    }

    #[test]
    fn unknown_schema_is_bad_parameter() {
        let err = classify_schema("ftp").unwrap_err();
        assert_eq!(err.code, shellmux_core::ErrorCode::BadParameter);
    }

    #[test]
    fn which_resolves_sh_on_path() {
        let resolved = which("sh").unwrap();
        assert!(resolved.ends_with("/sh"));
    }
}
