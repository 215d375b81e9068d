use url::Url;

/// Synchronicity mode requested by a caller of the replica/namespace `find`
/// family. This mirrors SAGA's three-valued task model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    Synchronous,
    Asynchronous,
    Task,
}

/// Result of a `find` call: either the URLs directly (synchronous mode) or an
/// opaque task handle the caller polls (asynchronous/task modes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOutcome {
    Urls(Vec<Url>),
    TaskHandle(String),
}

/// The interface the replica/logical-directory front end requires from an
/// adaptor layer. This front end is an external collaborator out of scope
/// for the factory itself (see PURPOSE & SCOPE) — this trait exists only to
/// document the shape the adaptor layer must expose; the factory does not
/// implement or call it.
pub trait ReplicaDirectory {
    /// Generic namespace find, used when no attribute pattern is supplied.
    fn find(&self, name_pattern: &str, flags: u32, mode: FindMode) -> FindOutcome;

    /// Attribute-aware replica find, used when an attribute pattern is supplied.
    fn find_replicas(
        &self,
        name_pattern: &str,
        attr_pattern: &str,
        flags: u32,
        mode: FindMode,
    ) -> FindOutcome;
}
