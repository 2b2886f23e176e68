use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("window manager connection failed")]
    Connection(#[source] anyhow::Error),
    #[error("failed to fetch the workspace list")]
    SnapshotFetch(#[source] anyhow::Error),
    #[error("failed to run command `{command}`")]
    Command {
        command: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("window manager state is inconsistent with the mirror: {0}")]
    Inconsistency(String),
    #[error("workspace `{0}` is already mirrored")]
    DuplicateWorkspace(Arc<str>),
    #[error("workspace `{0}` is not mirrored")]
    MissingWorkspace(Arc<str>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
