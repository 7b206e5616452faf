//! Static catalog of known task and command plugins.
//!
//! The registry is populated once at worker startup (see
//! [`crate::resolver::populate`]) and never mutated afterwards; lookups run
//! against an immutable snapshot shared behind an `Arc`. A task plugin id may
//! carry several type references (one per registered version, in registration
//! order); a command plugin key `(area, event)` is unique and matched
//! case-insensitively.

use std::collections::HashMap;

use crate::error::RegistryError;

/// One task plugin version: stable id, stage label, concrete implementation
/// reference.
#[derive(Debug, Clone)]
pub struct TaskPluginDescriptor {
    pub id: String,
    pub stage: String,
    pub type_reference: String,
}

/// One command plugin: case-insensitive `(area, event)` key, concrete
/// implementation reference, and the display name shown next to its
/// background work.
#[derive(Debug, Clone)]
pub struct CommandPluginDescriptor {
    pub area: String,
    pub event: String,
    pub type_reference: String,
    pub display_name: String,
}

/// Registered command plugin, as returned by lookup. Keeps the original
/// casing of area/event for display.
#[derive(Debug, Clone)]
pub struct CommandPluginEntry {
    pub area: String,
    pub event: String,
    pub type_reference: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    task_plugins: HashMap<String, Vec<String>>,
    command_plugins: HashMap<(String, String), CommandPluginEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one task plugin version. Later registrations under the same
    /// id append; insertion order is preserved and significant (callers pick
    /// the version, typically the most recent).
    pub fn register_task(&mut self, desc: TaskPluginDescriptor) -> Result<(), RegistryError> {
        if desc.stage.trim().is_empty() {
            return Err(RegistryError::EmptyTaskField {
                id: desc.id,
                field: "stage",
            });
        }
        self.task_plugins
            .entry(desc.id)
            .or_default()
            .push(desc.type_reference);
        Ok(())
    }

    /// Registers a command plugin. The last registration for a given
    /// `(area, event)` pair wins silently.
    pub fn register_command(&mut self, desc: CommandPluginDescriptor) -> Result<(), RegistryError> {
        let empty = |field| RegistryError::EmptyCommandField {
            area: desc.area.clone(),
            event: desc.event.clone(),
            field,
        };
        if desc.area.trim().is_empty() {
            return Err(empty("area"));
        }
        if desc.event.trim().is_empty() {
            return Err(empty("event"));
        }
        if desc.display_name.trim().is_empty() {
            return Err(empty("display_name"));
        }
        let key = (
            desc.area.to_ascii_lowercase(),
            desc.event.to_ascii_lowercase(),
        );
        self.command_plugins.insert(
            key,
            CommandPluginEntry {
                area: desc.area,
                event: desc.event,
                type_reference: desc.type_reference,
                display_name: desc.display_name,
            },
        );
        Ok(())
    }

    /// All registered implementations for a task id, in registration order.
    /// `None` means the id is unknown, which callers must be able to tell
    /// apart from an id without versions.
    pub fn lookup_task_plugins(&self, id: &str) -> Option<&[String]> {
        self.task_plugins.get(id).map(Vec::as_slice)
    }

    /// Case-insensitive command plugin lookup.
    pub fn lookup_command_plugin(&self, area: &str, event: &str) -> Option<&CommandPluginEntry> {
        let key = (area.to_ascii_lowercase(), event.to_ascii_lowercase());
        self.command_plugins.get(&key)
    }

    pub fn task_plugin_count(&self) -> usize {
        self.task_plugins.len()
    }

    pub fn command_plugin_count(&self) -> usize {
        self.command_plugins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, stage: &str, reference: &str) -> TaskPluginDescriptor {
        TaskPluginDescriptor {
            id: id.to_string(),
            stage: stage.to_string(),
            type_reference: reference.to_string(),
        }
    }

    fn command(area: &str, event: &str, reference: &str, name: &str) -> CommandPluginDescriptor {
        CommandPluginDescriptor {
            area: area.to_string(),
            event: event.to_string(),
            type_reference: reference.to_string(),
            display_name: name.to_string(),
        }
    }

    #[test]
    fn same_id_appends_in_registration_order() {
        let mut reg = PluginRegistry::new();
        reg.register_task(task("checkout", "checkout", "pkg::CheckoutV1"))
            .unwrap();
        reg.register_task(task("checkout", "checkout", "pkg::CheckoutV2"))
            .unwrap();

        let refs = reg.lookup_task_plugins("checkout").unwrap();
        assert_eq!(refs, ["pkg::CheckoutV1", "pkg::CheckoutV2"]);
    }

    #[test]
    fn unknown_task_id_is_absent_not_empty() {
        let reg = PluginRegistry::new();
        assert!(reg.lookup_task_plugins("nope").is_none());
    }

    #[test]
    fn command_lookup_is_case_insensitive() {
        let mut reg = PluginRegistry::new();
        reg.register_command(command("Build", "UploadLog", "pkg::UploadLog", "Upload log"))
            .unwrap();

        let a = reg.lookup_command_plugin("Build", "UploadLog").unwrap();
        let b = reg.lookup_command_plugin("build", "uploadlog").unwrap();
        assert_eq!(a.type_reference, b.type_reference);
        assert_eq!(a.display_name, "Upload log");
    }

    #[test]
    fn last_command_registration_wins() {
        let mut reg = PluginRegistry::new();
        reg.register_command(command("build", "uploadlog", "pkg::Old", "Old"))
            .unwrap();
        reg.register_command(command("BUILD", "UPLOADLOG", "pkg::New", "New"))
            .unwrap();

        let entry = reg.lookup_command_plugin("build", "uploadlog").unwrap();
        assert_eq!(entry.type_reference, "pkg::New");
        assert_eq!(reg.command_plugin_count(), 1);
    }

    #[test]
    fn empty_stage_is_rejected() {
        let mut reg = PluginRegistry::new();
        let err = reg
            .register_task(task("checkout", "  ", "pkg::Checkout"))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::EmptyTaskField { field: "stage", .. }
        ));
    }

    #[test]
    fn empty_display_name_is_rejected() {
        let mut reg = PluginRegistry::new();
        let err = reg
            .register_command(command("build", "uploadlog", "pkg::UploadLog", ""))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::EmptyCommandField {
                field: "display_name",
                ..
            }
        ));
    }
}
