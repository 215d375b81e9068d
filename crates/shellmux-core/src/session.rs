/// A single authentication context. The original source models these as
/// duck-typed attribute bags; here they are a tagged variant so the profile
/// builder can dispatch on the tag instead of probing for attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// An SSH identity: optional explicit user id, plus zero or more
    /// certificate (identity file) paths, each with an optional passphrase.
    SshKey {
        user_id: Option<String>,
        certs: Vec<SshCert>,
    },
    /// A plain username/password pair.
    UserPass {
        user_id: Option<String>,
        user_pass: Option<String>,
    },
    /// A grid-security X.509 proxy certificate, consumed only by the GSI
    /// transport family.
    X509Proxy { user_proxy: Option<String> },
}

/// One SSH identity file and its optional passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCert {
    pub path: String,
    pub passphrase: Option<String>,
}

/// An ordered sequence of authentication contexts. Order is significant:
/// later compatible contexts overwrite earlier ones for the same field,
/// before any URL override is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    contexts: Vec<AuthContext>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: AuthContext) -> Self {
        self.contexts.push(context);
        self
    }

    pub fn push(&mut self, context: AuthContext) {
        self.contexts.push(context);
    }

    pub fn contexts(&self) -> &[AuthContext] {
        &self.contexts
    }
}
