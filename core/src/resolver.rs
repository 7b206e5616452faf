//! Compile-time plugin factory table.
//!
//! Type references are resolved through a static catalog: each entry maps a
//! reference string to a factory function that builds the plugin descriptor.
//! Support modules a factory needs are located through an explicit
//! [`ResolveContext`] that is threaded into the call, so resolution state
//! cannot outlive a single `resolve` and cannot shadow unrelated lookups.

use std::path::{Path, PathBuf};

use crate::error::{RegistryError, ResolveError};
use crate::registry::{CommandPluginDescriptor, PluginRegistry, TaskPluginDescriptor};

/// Descriptor produced by a factory: either side of the plugin capability
/// split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSpec {
    Task {
        id: String,
        stage: String,
    },
    Command {
        area: String,
        event: String,
        display_name: String,
    },
}

impl PluginSpec {
    fn kind(&self) -> &'static str {
        match self {
            PluginSpec::Task { .. } => "task",
            PluginSpec::Command { .. } => "command",
        }
    }
}

pub type PluginFactory = fn(&ResolveContext) -> Result<PluginSpec, ResolveError>;

/// One row of the factory table.
#[derive(Clone, Copy)]
pub struct CatalogEntry {
    pub type_reference: &'static str,
    pub factory: PluginFactory,
}

/// Search context for support modules, scoped to a single well-known
/// directory and passed explicitly into every factory call.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    module_dir: PathBuf,
}

impl ResolveContext {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
        }
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Locates a required support module by name inside the module
    /// directory.
    pub fn require(&self, name: &str) -> Result<PathBuf, ResolveError> {
        let path = self.module_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResolveError::ModuleMissing {
                name: name.to_string(),
                dir: self.module_dir.clone(),
            })
        }
    }
}

/// Resolves a type reference against the catalog.
pub fn resolve(
    reference: &str,
    catalog: &[CatalogEntry],
    ctx: &ResolveContext,
) -> Result<PluginSpec, ResolveError> {
    let entry = catalog
        .iter()
        .find(|e| e.type_reference == reference)
        .ok_or_else(|| ResolveError::UnknownType(reference.to_string()))?;
    (entry.factory)(ctx)
}

/// Populates the registry from a catalog. Runs single-threaded at startup;
/// the first failure aborts population so no lookup can observe a partial
/// registry.
pub fn populate(
    registry: &mut PluginRegistry,
    catalog: &[CatalogEntry],
    ctx: &ResolveContext,
) -> Result<(), RegistryError> {
    for entry in catalog {
        let spec = resolve(entry.type_reference, catalog, ctx).map_err(|source| {
            RegistryError::Resolve {
                reference: entry.type_reference.to_string(),
                source,
            }
        })?;
        tracing::debug!(reference = entry.type_reference, kind = spec.kind(), "registering plugin");
        match spec {
            PluginSpec::Task { id, stage } => registry.register_task(TaskPluginDescriptor {
                id,
                stage,
                type_reference: entry.type_reference.to_string(),
            })?,
            PluginSpec::Command {
                area,
                event,
                display_name,
            } => registry.register_command(CommandPluginDescriptor {
                area,
                event,
                type_reference: entry.type_reference.to_string(),
                display_name,
            })?,
        }
    }
    Ok(())
}
