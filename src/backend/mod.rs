mod memory;
pub use memory::{InMemoryBackend, IN_MEMORY};

use crate::errors::Result;
use crate::policy::{Decision, Permissions, Rule};

/// Contract every policy store satisfies to be registered with an
/// `Authorizer`.
///
/// A back-end owns its policies exclusively and is shared between every
/// request that consults it, so all methods take `&self`. Stores that allow
/// mutation while serving decisions must guard their policy map so a reader
/// never observes a torn update.
pub trait Backend<R>: Send + Sync {
    /// The name the back-end registers under when none is given explicitly.
    fn name(&self) -> Option<&str>;

    /// Registers or overwrites the rule for `action`.
    fn set_policy(&self, action: &str, rule: Rule<R>) -> Result<()>;

    /// Removes the rule for `action`. Removing an absent policy is not an error.
    fn unset_policy(&self, action: &str) -> Result<()>;

    /// Evaluates the policy for `action` against `request`.
    ///
    /// Missing or malformed policies deny; this never fails.
    fn decide(&self, request: &R, action: &str) -> Decision;

    /// Evaluates every stored policy against `request`.
    fn serialize_all(&self, request: &R) -> Result<Permissions>;
}
