//! Settings shared by every resource of a manager.

use core::time::Duration;

/// Backend-independent resource configuration.
///
/// Passed explicitly into every [`Resource`](crate::Resource) and
/// [`ResourceManager`](crate::ResourceManager); there is no global copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    /// Gate for the destructive `clear` operation.
    pub emptying_allowed: bool,
    /// How long `disconnect` waits for outstanding handle borrowers.
    pub release_grace: Duration,
    /// Delay between two checks while waiting for borrowers.
    pub release_poll: Duration,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            emptying_allowed: false,
            release_grace: Duration::from_secs(2),
            release_poll: Duration::from_millis(50),
        }
    }
}

impl ResourceSettings {
    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows or forbids `clear`.
    #[must_use]
    pub fn with_emptying_allowed(mut self, allowed: bool) -> Self {
        self.emptying_allowed = allowed;
        self
    }

    /// Sets the release grace period.
    #[must_use]
    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    /// Sets the poll delay used while waiting for borrowers.
    #[must_use]
    pub fn with_release_poll(mut self, poll: Duration) -> Self {
        self.release_poll = poll;
        self
    }
}
