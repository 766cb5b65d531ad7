// src/config/scopes.rs

/// The `scripts` value as seen at each configuration scope.
///
/// `None` means the scope does not set `scripts` at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptsInspection {
    pub default_value: Option<Vec<String>>,
    pub global_value: Option<Vec<String>>,
    pub workspace_value: Option<Vec<String>>,
    pub workspace_folder_value: Option<Vec<String>>,
}

/// Patterns in effect for a cycle.
///
/// Every override scope that sets `scripts` contributes (global, then
/// workspace folder, then workspace). The default scope is used only when
/// none of them does.
pub fn effective_patterns(inspection: &ScriptsInspection) -> Vec<String> {
    let overrides = [
        &inspection.global_value,
        &inspection.workspace_folder_value,
        &inspection.workspace_value,
    ];

    if overrides.iter().all(|scope| scope.is_none()) {
        return inspection.default_value.clone().unwrap_or_default();
    }

    overrides
        .into_iter()
        .flatten()
        .flat_map(|patterns| patterns.iter().cloned())
        .collect()
}
