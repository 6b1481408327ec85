//! The shared environment cell.

use std::fmt;

use parking_lot::Mutex;
use vela_externs::{Environment, Externs};

/// Lock-guarded registry of accumulated type/name information.
///
/// Created at plan construction, seeded with a base environment, and passed
/// explicitly to every compiling agent. Merges are exclusive; the driver
/// merges a module's externs before publishing its result, so a dependent
/// never observes an environment missing one of its dependencies.
pub struct EnvCell {
    inner: Mutex<Environment>,
}

impl EnvCell {
    /// Create a cell seeded with `base`.
    pub fn new(base: Environment) -> Self {
        EnvCell {
            inner: Mutex::new(base),
        }
    }

    /// Merge a completed module's exports under exclusive access.
    pub fn merge_externs(&self, externs: &Externs) {
        self.inner.lock().merge_externs(externs);
    }

    /// Run `f` with exclusive access to the environment.
    pub fn with<R>(&self, f: impl FnOnce(&Environment) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Clone the current environment out of the cell.
    pub fn snapshot(&self) -> Environment {
        self.inner.lock().clone()
    }
}

impl fmt::Debug for EnvCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCell")
            .field("declarations", &self.inner.lock().len())
            .finish()
    }
}
