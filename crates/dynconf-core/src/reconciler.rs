//! Reconciler facade
//!
//! Wires the registry, diff engine, classifier and compiler into the two
//! questions an operator asks: what differs, and what to send.

use std::sync::Arc;

use dynconf_compile::{compile, InfoSource};
use dynconf_diff::{diff_with_registry, non_dynamic_keys, DiffReport};
use dynconf_model::{flatten, ConfigTree};
use dynconf_schema::{DirSource, SchemaRegistry};
use serde::Serialize;

use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;

/// Outcome of planning one reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "plan")]
pub enum Plan {
    /// Every change applies live; commands in application order
    Dynamic { commands: Vec<String> },
    /// Some changes need a restart; nothing is sent
    RequiresRestart { keys: Vec<String> },
}

impl Plan {
    /// Check if the plan can be applied live
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }

    /// Commands to send, empty when a restart is required
    #[must_use]
    pub fn commands(&self) -> &[String] {
        match self {
            Self::Dynamic { commands } => commands,
            Self::RequiresRestart { .. } => &[],
        }
    }
}

/// Reconciles desired configuration against live nodes
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: Arc<SchemaRegistry>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create reconciler over a loaded registry
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>, config: ReconcilerConfig) -> Self {
        Self { registry, config }
    }

    /// Create reconciler loading schemas from `config.schema_dir`
    ///
    /// # Errors
    /// Returns error if no schema directory is configured or it cannot be loaded
    pub fn from_config(config: ReconcilerConfig) -> Result<Self, ReconcileError> {
        let dir = config
            .schema_dir
            .clone()
            .ok_or(ReconcileError::MissingSchemaDir)?;
        let registry = SchemaRegistry::from_source(&DirSource::new(dir))?;
        tracing::info!(versions = registry.len(), "schema registry loaded");
        Ok(Self::new(Arc::new(registry), config))
    }

    /// Get registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Diff a desired tree against a node's current tree
    ///
    /// # Errors
    /// Returns error on version problems, or if validation is enabled and the
    /// desired tree does not satisfy its schema
    pub fn diff(
        &self,
        desired: &ConfigTree,
        current: &ConfigTree,
        version: &str,
    ) -> Result<DiffReport, ReconcileError> {
        if self.config.validate_desired {
            self.registry.validate(version, desired)?;
        }
        let report = diff_with_registry(
            &flatten(desired),
            &flatten(current),
            version,
            &self.registry,
            self.config.diff_options(),
        )?;
        for key in &report.unresolved_defaults {
            tracing::warn!(%key, version, "no unambiguous schema default, key left unchanged");
        }
        Ok(report)
    }

    /// Diff, classify and compile
    ///
    /// A change-set with any non-dynamic key yields
    /// [`Plan::RequiresRestart`] and compiles nothing.
    ///
    /// # Errors
    /// Returns error if diffing fails or any change has no command form
    pub fn plan(
        &self,
        desired: &ConfigTree,
        current: &ConfigTree,
        version: &str,
        info: Option<&dyn InfoSource>,
    ) -> Result<Plan, ReconcileError> {
        let report = self.diff(desired, current, version)?;
        let keys = non_dynamic_keys(&report.changes, version, &self.registry)?;
        if !keys.is_empty() {
            tracing::info!(version, rejected = keys.len(), "changes require restart");
            return Ok(Plan::RequiresRestart { keys });
        }
        let commands = compile(&report.changes, info)?;
        tracing::info!(version, commands = commands.len(), "dynamic plan compiled");
        Ok(Plan::Dynamic { commands })
    }
}
