use stagehand_core::error::{RegistryError, ResolveError};
use stagehand_core::resolver::{populate, CatalogEntry, PluginSpec, ResolveContext};
use stagehand_core::PluginRegistry;

/// Stable id of the repository checkout task. Both checkout versions
/// register under it, in version order.
pub const CHECKOUT_TASK_ID: &str = "repository-checkout";

/// Stable id of the post-job cleanup task.
pub const CLEANUP_TASK_ID: &str = "repository-cleanup";

/// Support module the checkout task shells out to for repository transport.
const GIT_FETCHER_MODULE: &str = "git-fetcher";

fn checkout_v1(ctx: &ResolveContext) -> Result<PluginSpec, ResolveError> {
    ctx.require(GIT_FETCHER_MODULE)?;
    Ok(PluginSpec::Task {
        id: CHECKOUT_TASK_ID.to_string(),
        stage: "checkout".to_string(),
    })
}

fn checkout_v2(ctx: &ResolveContext) -> Result<PluginSpec, ResolveError> {
    ctx.require(GIT_FETCHER_MODULE)?;
    Ok(PluginSpec::Task {
        id: CHECKOUT_TASK_ID.to_string(),
        stage: "checkout".to_string(),
    })
}

fn cleanup(_ctx: &ResolveContext) -> Result<PluginSpec, ResolveError> {
    Ok(PluginSpec::Task {
        id: CLEANUP_TASK_ID.to_string(),
        stage: "cleanup".to_string(),
    })
}

fn upload_log(_ctx: &ResolveContext) -> Result<PluginSpec, ResolveError> {
    Ok(PluginSpec::Command {
        area: "results".to_string(),
        event: "uploadlog".to_string(),
        display_name: "Upload log".to_string(),
    })
}

fn associate_artifact(_ctx: &ResolveContext) -> Result<PluginSpec, ResolveError> {
    Ok(PluginSpec::Command {
        area: "artifact".to_string(),
        event: "associate".to_string(),
        display_name: "Associate artifact".to_string(),
    })
}

const BUILTIN: &[CatalogEntry] = &[
    CatalogEntry {
        type_reference: "stagehand_plugins::checkout::CheckoutV1",
        factory: checkout_v1,
    },
    CatalogEntry {
        type_reference: "stagehand_plugins::checkout::CheckoutV2",
        factory: checkout_v2,
    },
    CatalogEntry {
        type_reference: "stagehand_plugins::cleanup::Cleanup",
        factory: cleanup,
    },
    CatalogEntry {
        type_reference: "stagehand_plugins::results::UploadLog",
        factory: upload_log,
    },
    CatalogEntry {
        type_reference: "stagehand_plugins::artifact::Associate",
        factory: associate_artifact,
    },
];

/// The worker's compile-time plugin table.
pub fn builtin_catalog() -> &'static [CatalogEntry] {
    BUILTIN
}

/// Populates a registry with every builtin plugin. Fatal on the first
/// failure, leaving startup to abort rather than run partially populated.
pub fn populate_builtin(
    registry: &mut PluginRegistry,
    ctx: &ResolveContext,
) -> Result<(), RegistryError> {
    populate(registry, BUILTIN, ctx)?;
    tracing::info!(
        task_plugins = registry.task_plugin_count(),
        command_plugins = registry.command_plugin_count(),
        "plugin registry populated"
    );
    Ok(())
}
