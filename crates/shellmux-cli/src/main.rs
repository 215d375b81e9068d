use std::{process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use shellmux_core::{AuthContext, Session, SshCert};
use thiserror::Error;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "shellmux", about = "PTY shell factory smoke-test CLI")]
struct Cli {
    /// Target, e.g. ssh://user@host/, sh://localhost/, gsissh://host/
    url: String,

    /// Username, overrides any username embedded in `url`.
    #[arg(long)]
    user: Option<String>,
    /// Password, overrides any password embedded in `url`.
    #[arg(long)]
    pass: Option<String>,
    /// SSH identity file to try before password authentication.
    #[arg(long)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open an interactive shell against the target and relay stdin/stdout.
    Shell,
    /// Copy a local file to the target.
    CopyTo { src: String, tgt: String },
    /// Copy a file from the target to a local path.
    CopyFrom { src: String, tgt: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    ShellMux(#[from] shellmux_core::ShellMuxError),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let url = Url::parse(&cli.url)?;
    let session = build_session(&cli);

    match cli.command {
        Command::Shell => run_shell(&url, &session).await,
        Command::CopyTo { src, tgt } => {
            shellmux_factory::copy_to(&url, &session, &src, &tgt, "").await?;
            println!("copied {src} -> {}:{tgt}", cli.url);
            Ok(())
        }
        Command::CopyFrom { src, tgt } => {
            shellmux_factory::copy_from(&url, &session, &src, &tgt, "").await?;
            println!("copied {}:{src} -> {tgt}", cli.url);
            Ok(())
        }
    }
}

fn build_session(cli: &Cli) -> Session {
    let mut session = Session::new();

    if let Some(identity) = &cli.identity {
        session.push(AuthContext::SshKey {
            user_id: cli.user.clone(),
            certs: vec![SshCert {
                path: identity.clone(),
                passphrase: None,
            }],
        });
    } else if cli.user.is_some() || cli.pass.is_some() {
        session.push(AuthContext::UserPass {
            user_id: cli.user.clone(),
            user_pass: cli.pass.clone(),
        });
    }

    session
}

async fn run_shell(url: &Url, session: &Session) -> Result<(), CliError> {
    let pty = shellmux_factory::shell(url, session).await?;
    println!("connected, type commands (Ctrl-D to exit)");

    let mut offset = 0usize;
    loop {
        let mut line = String::new();
        let read = std::io::stdin().read_line(&mut line)?;
        if read == 0 {
            break;
        }
        pty.write(line.as_bytes())?;

        tokio::time::sleep(Duration::from_millis(200)).await;
        let (chunk, new_offset) = pty.output_since(offset);
        offset = new_offset;
        print!("{}", String::from_utf8_lossy(&chunk));

        if !pty.alive(false) {
            break;
        }
    }

    Ok(())
}
