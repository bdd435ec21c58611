use thiserror::Error;

/// Classifies a failed run. Attached as context to the underlying error so the
/// caller can `downcast_ref::<ErrorKind>()` without parsing messages.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ErrorKind {
    #[error("This program must be run as root")]
    NotRoot,

    #[error("Network is unreachable (could not reach {0})")]
    NoNetwork(String),

    #[error("{0} is not a block device")]
    NoSuchDisk(String),

    #[error("Could not find {0}")]
    NoTool(String),

    #[error("Operation declined by the operator")]
    Declined,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Partitioning error")]
    Partitioning,

    #[error("Error formatting filesystems")]
    Formatting,

    #[error("Error mounting filesystems")]
    Mounting,

    #[error("Pacstrap error")]
    Pacstrap,

    #[error("fstab error")]
    Fstab,

    #[error("Post installation configuration error")]
    Configuration,

    #[error("Bootloader error")]
    Bootloader,

    #[error("Error setting up the AUR helper")]
    AurHelper,

    #[error("Failed unmounting filesystems")]
    UmountFailure,

    #[error("Error caused by the interactive mode")]
    Interactive,
}

/// Returns the `ErrorKind` attached anywhere in the error chain.
pub fn kind_of(error: &anyhow::Error) -> Option<&ErrorKind> {
    error.downcast_ref::<ErrorKind>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn kind_survives_nested_context() {
        let result: anyhow::Result<()> = Err(ErrorKind::NotRoot.into());
        let error = result
            .context("preflight")
            .context("install")
            .unwrap_err();

        assert_eq!(kind_of(&error), Some(&ErrorKind::NotRoot));
    }

    #[test]
    fn kind_as_context() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("exit status 1"));
        let error = result.context(ErrorKind::Partitioning).unwrap_err();

        assert_eq!(kind_of(&error), Some(&ErrorKind::Partitioning));
        assert_eq!(error.to_string(), "Partitioning error");
    }
}
