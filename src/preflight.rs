//! Host tool checks run before touching the registry or the store.

use anyhow::{bail, Result};

use crate::cli::Action;

/// (command, package providing it)
type Tool = (&'static str, &'static str);

/// Needed by every action.
pub const REGISTRY_TOOLS: &[Tool] = &[("openstack", "python-openstackclient")];

/// Needed by actions that build an image.
pub const BUILD_TOOLS: &[Tool] = &[
    ("mktemp", "coreutils"),
    ("sudo", "sudo"),
    ("snap", "snapd"),
    ("ubuntu-device-flash", "ubuntu-device-flash"),
    ("qemu-img", "qemu-utils"),
];

/// Tools `action` will invoke.
pub fn tools_for(action: Action) -> Vec<Tool> {
    let mut tools = REGISTRY_TOOLS.to_vec();
    if matches!(action, Action::Build | Action::Create) {
        tools.extend_from_slice(BUILD_TOOLS);
    }
    tools
}

/// Tools from `tools` that `is_installed` does not find.
fn missing_tools(tools: &[Tool], is_installed: impl Fn(&str) -> bool) -> Vec<Tool> {
    tools
        .iter()
        .copied()
        .filter(|(command, _)| !is_installed(command))
        .collect()
}

/// Fail with one line per missing tool if `action` cannot run on this host.
pub fn check_action(action: Action) -> Result<()> {
    let missing = missing_tools(&tools_for(action), |cmd| which::which(cmd).is_ok());
    if missing.is_empty() {
        return Ok(());
    }

    let lines: Vec<String> = missing
        .iter()
        .map(|(command, package)| format!("  {command} (from package {package})"))
        .collect();
    bail!(
        "cannot run '{:?}', tools not found on PATH:\n{}",
        action,
        lines.join("\n")
    )
}
