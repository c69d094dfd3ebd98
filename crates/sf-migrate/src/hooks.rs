//! Progress callbacks invoked by the runner around each step.

use crate::error::MigrateError;
use crate::script::{DownScript, MigrationScript};
use std::fmt;
use std::time::Duration;

type ScriptHook = Box<dyn Fn(&MigrationScript) + Send + Sync>;
type ScriptDoneHook = Box<dyn Fn(&MigrationScript, Duration) + Send + Sync>;
type RollbackHook = Box<dyn Fn(&DownScript) + Send + Sync>;
type RollbackDoneHook = Box<dyn Fn(&DownScript, Duration) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&MigrateError) + Send + Sync>;

/// Optional callbacks fired by [`MigrationRunner`](crate::MigrationRunner).
///
/// Hooks observe progress only; they cannot change the outcome of a step.
#[derive(Default)]
pub struct MigrationHooks {
    /// Called before a forward script runs
    pub before_migration: Option<ScriptHook>,
    /// Called after a forward script is committed
    pub after_migration: Option<ScriptDoneHook>,
    /// Called before a down script runs
    pub before_rollback: Option<RollbackHook>,
    /// Called after a down script is committed
    pub after_rollback: Option<RollbackDoneHook>,
    /// Called once with the error that aborted an operation
    pub on_error: Option<ErrorHook>,
}

impl MigrationHooks {
    pub(crate) fn before_migration(&self, script: &MigrationScript) {
        if let Some(hook) = &self.before_migration {
            hook(script);
        }
    }

    pub(crate) fn after_migration(&self, script: &MigrationScript, elapsed: Duration) {
        if let Some(hook) = &self.after_migration {
            hook(script, elapsed);
        }
    }

    pub(crate) fn before_rollback(&self, down: &DownScript) {
        if let Some(hook) = &self.before_rollback {
            hook(down);
        }
    }

    pub(crate) fn after_rollback(&self, down: &DownScript, elapsed: Duration) {
        if let Some(hook) = &self.after_rollback {
            hook(down, elapsed);
        }
    }

    pub(crate) fn on_error(&self, err: &MigrateError) {
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }
}

impl fmt::Debug for MigrationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationHooks")
            .field("before_migration", &self.before_migration.is_some())
            .field("after_migration", &self.after_migration.is_some())
            .field("before_rollback", &self.before_rollback.is_some())
            .field("after_rollback", &self.after_rollback.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
