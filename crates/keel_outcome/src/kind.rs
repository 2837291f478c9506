//! Error classification for failed outcomes.

use core::fmt::Debug;

/// Name reported by every successful outcome.
pub const SUCCEED_NAME: &str = "Succeed";

/// Placeholder reported for chain entries whose kind cannot be determined.
pub const MISSING_ERROR_KIND: &str = "MISSING_ERROR_KIND";

/// A classification of the ways a family of operations can fail.
///
/// Every fallible operation family defines one enum implementing this trait,
/// so a caller matching on [`Failure::kind`](crate::Failure::kind) gets
/// exhaustiveness checking for exactly the failures that operation can
/// produce.
///
/// # Example
///
/// ```
/// use keel_outcome::ErrorKind;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum LoadError {
///     Missing,
///     Corrupt,
/// }
///
/// impl ErrorKind for LoadError {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Missing => "LoadMissingError",
///             Self::Corrupt => "LoadCorruptError",
///         }
///     }
/// }
///
/// assert_eq!(LoadError::Corrupt.name(), "LoadCorruptError");
/// ```
pub trait ErrorKind: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Stable, client-facing name of this kind (e.g. `NotConnectedError`).
    ///
    /// Names show up in cause kind chains, logs and error reports, so they
    /// must not change between releases.
    fn name(&self) -> &'static str;
}

/// Returns the last path segment of a type name, without generic arguments.
///
/// `std::io::Error` becomes `Error`, `alloc::vec::Vec<u8>` becomes `Vec`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
