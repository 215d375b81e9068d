//! PTY dialog engine: drives a freshly spawned master or slave PTY through
//! authentication and greeting prompts until a stable shell prompt appears.
//!
//! Grounded directly on `_initialize_pty` in the original factory: four
//! ordered prompt patterns, a password/passphrase/host-key/shell-prompt state
//! machine, host-key confirmation always answered `yes`.

use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use regex::Regex;
use shellmux_core::ShellMuxError;
use shellmux_pty::PtyProcess;

/// Per-attempt PTY read timeout, matching the original's `_PTY_TIMEOUT`.
const PTY_TIMEOUT: Duration = Duration::from_secs(2);

/// Bounded attempt count guarding against a dialog that never reaches a
/// prompt. Not present in the original (which loops unconditionally); added
/// per this crate's open-question decision so a hung dialog fails instead of
/// blocking a caller forever. Generous enough not to interrupt a slow login.
const MAX_ATTEMPTS: usize = 60;

static PROMPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)[Pp]assword:\s*$").unwrap(),
        Regex::new(r"Enter passphrase for key '.*':\s*$").unwrap(),
        Regex::new(r"want to continue connecting").unwrap(),
        Regex::new(r"(?m)^(.*[$#%>])\s*$").unwrap(),
    ]
});

/// Drives `pty` through the authentication dialog. `password` is used for
/// index-0 (password) prompts; `cert_passwords` supplies passphrases keyed by
/// the certificate path extracted from index-1 (passphrase) prompts.
pub fn run_dialog(
    pty: &PtyProcess,
    password: &str,
    cert_passwords: &BTreeMap<String, String>,
) -> Result<(), ShellMuxError> {
    let mut attempts = 0usize;

    loop {
        let found = pty
            .find(&PROMPT_PATTERNS, PTY_TIMEOUT)
            .map_err(|err| err.classify())?;

        let Some(prompt) = found else {
            attempts += 1;
            if attempts >= MAX_ATTEMPTS {
                return Err(ShellMuxError::no_success(format!(
                    "no prompt recognized after {MAX_ATTEMPTS} attempts"
                ))
                .classify());
            }
            continue;
        };

        match prompt.index {
            0 => {
                tracing::debug!("got password prompt");
                if password.is_empty() {
                    return Err(ShellMuxError::authentication_failed(format!(
                        "prompted for unknown password ({})",
                        prompt.text
                    )));
                }
                pty.write(format!("{password}\n").as_bytes())
                    .map_err(|err| err.classify())?;
            }
            1 => {
                tracing::debug!(prompt = %prompt.text, "got passphrase prompt");
                let cert = extract_cert_name(&prompt.text).ok_or_else(|| {
                    ShellMuxError::authentication_failed(format!(
                        "could not extract cert name ({})",
                        prompt.text
                    ))
                })?;
                let Some(passphrase) = cert_passwords.get(&cert) else {
                    return Err(ShellMuxError::authentication_failed(format!(
                        "prompted for unknown certificate password ({cert})"
                    )));
                };
                pty.write(format!("{passphrase}\n").as_bytes())
                    .map_err(|err| err.classify())?;
            }
            2 => {
                tracing::debug!("got hostkey prompt");
                pty.write(b"yes\n").map_err(|err| err.classify())?;
            }
            _ => {
                tracing::debug!("got initial shell prompt");
                return Ok(());
            }
        }

        attempts = 0;
    }
}

/// Extracts the certificate path between the first two single quotes in a
/// passphrase prompt, e.g. `Enter passphrase for key '/home/u/.ssh/id_rsa':`.
fn extract_cert_name(matched: &str) -> Option<String> {
    let start = matched.find('\'')?;
    let end = matched[start + 1..].find('\'')? + start + 1;
    Some(matched[start + 1..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn extracts_cert_name_from_passphrase_prompt() {
        let cert = extract_cert_name("Enter passphrase for key '/home/u/.ssh/id_rsa':").unwrap();
        assert_eq!(cert, "/home/u/.ssh/id_rsa");
    }

    #[test]
    fn extract_cert_name_fails_without_closing_quote() {
        assert!(extract_cert_name("Enter passphrase for key '/home/u/.ssh/id_rsa").is_none());
    }

    #[test]
    fn prompt_patterns_recognize_each_prompt_kind() {
        assert!(PROMPT_PATTERNS[0].is_match("Password: "));
        assert!(PROMPT_PATTERNS[0].is_match("password:"));
        assert!(PROMPT_PATTERNS[1].is_match("Enter passphrase for key '/x/y':"));
        assert!(
            PROMPT_PATTERNS[2].is_match("Are you sure you want to continue connecting (yes/no)?")
        );
        assert!(PROMPT_PATTERNS[3].is_match("user@host:~$"));
    }

    #[test]
    fn full_dialog_against_a_real_shell_reaches_prompt() {
        let env = BTreeMap::from([("TERM".to_string(), "vt100".to_string())]);
        let pty = PtyProcess::spawn("/bin/sh", &["-i".to_string()], &env).unwrap();
        let result = run_dialog(&pty, "", &BTreeMap::new());
        assert!(result.is_ok(), "{result:?}");
        pty.write(b"exit\n").ok();
        pty.wait().ok();
    }

    /// Regression test: a host-key prompt must be answered once and then
    /// consumed, not re-matched forever. Before the PTY's read cursor was
    /// made persistent, the unanchored host-key pattern stayed visible in
    /// the buffer after being answered, so `run_dialog` never reached the
    /// shell prompt. Run on a background thread with a hard timeout so a
    /// regression fails the test instead of hanging the suite.
    #[test]
    fn host_key_prompt_is_answered_once_and_shell_prompt_is_reached() {
        let env = BTreeMap::from([("TERM".to_string(), "vt100".to_string())]);
        let pty = Arc::new(
            PtyProcess::spawn(
                "/bin/sh",
                &[
                    "-c".to_string(),
                    "printf 'Are you sure you want to continue connecting (yes/no)? '; \
                     read ans; exec /bin/sh -i"
                        .to_string(),
                ],
                &env,
            )
            .unwrap(),
        );

        let dialog_pty = Arc::clone(&pty);
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let result = run_dialog(&dialog_pty, "", &BTreeMap::new());
            tx.send(result).ok();
        });

        let result = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("run_dialog must terminate instead of looping on the host-key prompt");
        assert!(result.is_ok(), "{result:?}");

        pty.write(b"exit\n").ok();
        pty.wait().ok();
    }
}
