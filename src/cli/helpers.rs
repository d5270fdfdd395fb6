//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader;
use crate::core::workspace::Workspace;
use crate::entities::constraint::Constraint;
use crate::entities::pattern::AssemblyPattern;
use crate::entities::task::AssemblyTask;

/// Open the workspace from --project or by walking up from the cwd
pub fn open_workspace(global: &GlobalOpts) -> Result<Workspace> {
    let workspace = match &global.project {
        Some(path) => Workspace::discover_from(path),
        None => Workspace::discover(),
    };
    workspace.map_err(|e| miette::miette!("{}", e))
}

/// Format an EntityId for display, truncating if too long
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Load a task by full or partial id
pub fn load_task(workspace: &Workspace, id: &str) -> Result<(std::path::PathBuf, AssemblyTask)> {
    loader::load_entity(&workspace.entity_dir(EntityPrefix::Task), id)?
        .ok_or_else(|| miette::miette!("task '{}' not found", id))
}

/// Load a constraint by full or partial id
pub fn load_constraint(
    workspace: &Workspace,
    id: &str,
) -> Result<(std::path::PathBuf, Constraint)> {
    loader::load_entity(&workspace.entity_dir(EntityPrefix::Con), id)?
        .ok_or_else(|| miette::miette!("constraint '{}' not found", id))
}

/// All constraints belonging to a task, in file order
pub fn load_task_constraints(workspace: &Workspace, task: &AssemblyTask) -> Result<Vec<Constraint>> {
    let all: Vec<Constraint> = loader::load_all(&workspace.entity_dir(EntityPrefix::Con))?;
    Ok(all.into_iter().filter(|c| c.task_id == task.id).collect())
}

/// All learned patterns, in file order
pub fn load_patterns(workspace: &Workspace) -> Result<Vec<AssemblyPattern>> {
    let mut patterns = Vec::new();
    for path in workspace.iter_entity_files(EntityPrefix::Ptrn) {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| miette::miette!("{}: {}", path.display(), e))?;
        let pattern: AssemblyPattern = serde_yml::from_str(&content)
            .map_err(|e| miette::miette!("{}: {}", path.display(), e))?;
        patterns.push(pattern);
    }
    Ok(patterns)
}
