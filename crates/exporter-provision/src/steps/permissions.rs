//! Binary ownership and mode

use super::{ENSURE_USER, INSTALL_BINARY, Idempotency, SET_PERMISSIONS, Step};
use crate::classify::Outcome;
use crate::context::Context;
use crate::error::ProvisionError;

/// Hand the installed binary to the service account and make it executable
#[derive(Debug, Clone)]
pub struct SetPermissions {
    /// Owner, as `user:group`
    pub owner: String,
    /// Octal mode passed to chmod
    pub mode: String,
    description: String,
}

impl SetPermissions {
    pub fn new(user: &str) -> Self {
        Self {
            owner: format!("{user}:{user}"),
            mode: "755".into(),
            description: format!("Set binary ownership to {user}"),
        }
    }
}

impl Step for SetPermissions {
    fn name(&self) -> &'static str {
        SET_PERMISSIONS
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::Overwrite
    }

    fn requires(&self) -> &'static [&'static str] {
        &[ENSURE_USER, INSTALL_BINARY]
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        let path = ctx.config().install_path.to_string_lossy();

        // Either command failing stops the run before the service starts
        ctx.exec(&["chown", &self.owner, &path])?;
        ctx.exec(&["chmod", &self.mode, &path])?;
        Ok(Outcome::Success)
    }
}
