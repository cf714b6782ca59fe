//! Task CLI commands
//!
//! Listing, showing and deleting tasks in the extension's storage, plus the
//! `config` overview.

use std::path::Path;

use crate::config::{EditorPaths, Settings};
use crate::display::{format_task_details, format_task_list};
use crate::error::TaskManResult;
use crate::hooks::load_decorator;
use crate::storage::{task_stats, TaskRepository};

/// Handle `list`
pub fn handle_list_command(paths: &EditorPaths, settings: &Settings) -> TaskManResult<()> {
    let repo = TaskRepository::new(paths.storage_root()?);
    let decorator = load_decorator(&settings.hooks_dir);
    let tasks = repo.load_with(decorator.as_ref())?;

    if tasks.is_empty() {
        println!("No tasks found under {}", repo.root().display());
        return Ok(());
    }

    println!("{}", format_task_list(&tasks));
    Ok(())
}

/// Handle `show <id>`
pub fn handle_show_command(paths: &EditorPaths, settings: &Settings, id: &str) -> TaskManResult<()> {
    let repo = TaskRepository::new(paths.storage_root()?);
    let decorator = load_decorator(&settings.hooks_dir);
    let task = repo.find(id)?;
    let task = decorator.extend(&task).unwrap_or(task);

    let stats = task_stats(&task);
    println!("{}", format_task_details(&task, &stats, decorator.as_ref()));
    Ok(())
}

/// Handle `delete <id>`; without `force` only reports what would be removed
pub fn handle_delete_command(paths: &EditorPaths, id: &str, force: bool) -> TaskManResult<()> {
    let repo = TaskRepository::new(paths.storage_root()?);
    let task = repo.find(id)?;

    if !force {
        println!("This will permanently delete {}", task.path.display());
        println!("To proceed, run again with --force flag:");
        println!("  roo-task-man delete {} --force", id);
        return Ok(());
    }

    repo.delete(&task)?;
    println!("Deleted task {}", task.id);
    Ok(())
}

/// Handle `config`: show resolved paths and settings, optionally saving them
pub fn handle_config_command(
    paths: &EditorPaths,
    settings: &Settings,
    config_file: &Path,
    save: bool,
) -> TaskManResult<()> {
    println!("roo-task-man Configuration");
    println!("==========================");
    println!("Config file:    {}", config_file.display());
    println!("Editor:         {}", paths.editor_name());
    println!("Plugin ID:      {}", paths.plugin_id());
    match paths.state_dir() {
        Ok(dir) => println!("State dir:      {}", dir.display()),
        Err(e) => println!("State dir:      ({})", e),
    }
    match paths.storage_root() {
        Ok(dir) => println!("Task storage:   {}", dir.display()),
        Err(e) => println!("Task storage:   ({})", e),
    }
    println!("Hooks dir:      {}", settings.hooks_dir.display());
    println!("Export dir:     {}", settings.export_dir_or_cwd().display());
    println!("Debug:          {}", settings.debug);

    if save {
        settings.save(config_file)?;
        println!();
        println!("Settings saved to {}", config_file.display());
    }
    Ok(())
}
