// ABOUTME: Recursive ownership enforcement over deploy directories.
// ABOUTME: Runs chown through the command executor when a user or group is set.

use std::path::Path;

use super::command::{CommandExecutor, CommandSpec, ExecError};

/// Owner applied to the deploy root and release trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    pub user: Option<String>,
    pub group: Option<String>,
}

impl Ownership {
    pub fn new(user: Option<String>, group: Option<String>) -> Self {
        Self { user, group }
    }

    pub fn is_set(&self) -> bool {
        self.user.is_some() || self.group.is_some()
    }

    /// `user:group`, `user`, or `:group` as chown expects.
    pub fn chown_spec(&self) -> Option<String> {
        match (&self.user, &self.group) {
            (Some(user), Some(group)) => Some(format!("{user}:{group}")),
            (Some(user), None) => Some(user.clone()),
            (None, Some(group)) => Some(format!(":{group}")),
            (None, None) => None,
        }
    }

    /// Recursively chown `path`. Does nothing when no owner is configured.
    pub async fn enforce(
        &self,
        executor: &dyn CommandExecutor,
        path: &Path,
    ) -> Result<(), ExecError> {
        let Some(owner) = self.chown_spec() else {
            return Ok(());
        };

        tracing::debug!("Enforcing ownership {} on {}", owner, path.display());
        let spec = CommandSpec::argv([
            "chown".to_string(),
            "-R".to_string(),
            owner,
            path.display().to_string(),
        ]);
        executor.run(&spec).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chown_spec_formats() {
        let both = Ownership::new(Some("deploy".into()), Some("www".into()));
        assert_eq!(both.chown_spec().as_deref(), Some("deploy:www"));

        let user = Ownership::new(Some("deploy".into()), None);
        assert_eq!(user.chown_spec().as_deref(), Some("deploy"));

        let group = Ownership::new(None, Some("www".into()));
        assert_eq!(group.chown_spec().as_deref(), Some(":www"));

        assert!(Ownership::default().chown_spec().is_none());
        assert!(!Ownership::default().is_set());
    }
}
