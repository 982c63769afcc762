//! A bunch of wrap errors.

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors enum mapping global custom errors.
/// The error type can be expressed in decimal, where the high decs represent
/// the error category and the low decs represent the error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[repr(u32)]
pub enum Error {
    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String) = 100,
    #[error("Invalid ip version {0}, expect 4 or 6")]
    InvalidIpVersion(u8) = 200,
    #[error("No well-known peer configured")]
    MissingWellKnownPeers = 202,
    #[error("Create File Error: {0}")]
    CreateFileError(String) = 300,
    #[error("Open File Error: {0}")]
    OpenFileError(String) = 301,
    #[error("Cannot find home directory")]
    HomeDirError = 302,
    #[error("Cannot find parent directory")]
    ParentDirError = 303,
    #[error("Serde yaml error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error) = 400,
    #[error("Transport error: {0}")]
    TransportError(#[from] chordring_transport::error::Error) = 500,
    #[error("Core error: {0}")]
    CoreError(#[from] chordring_core::error::Error) = 600,
}

impl Error {
    fn discriminant(&self) -> u32 {
        // SAFETY: `Self` is `repr(u32)`, so its layout is a `repr(C)` union of
        // `repr(C)` structs that all start with the `u32` discriminant.
        // ref: https://doc.rust-lang.org/std/mem/fn.discriminant.html
        unsafe { *<*const _>::from(self).cast::<u32>() }
    }

    /// Numeric code of the error, grouped by category.
    pub fn code(&self) -> u32 {
        self.discriminant()
    }
}
