//! `camber init` command - Initialize a new camber workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
    }

    match Workspace::init(&path) {
        Ok(workspace) => {
            seed_standards(workspace.root())?;
            println!(
                "{} Initialized camber workspace at {}",
                style("✓").green(),
                style(workspace.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            print_structure(workspace.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Add part files under catalog/parts/",
                style("$EDITOR catalog/parts/...").yellow()
            );
            println!(
                "  {} Build the name-matching corpus",
                style("camber parts index").yellow()
            );
            println!(
                "  {} Create a task from a BOM",
                style("camber task new --name spool --bom bom.csv").yellow()
            );
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} camber workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

/// Write a starter standards table so inference has a DEFAULT row
fn seed_standards(root: &Path) -> Result<()> {
    let path = root.join("catalog/standards.yaml");
    if path.exists() {
        return Ok(());
    }
    std::fs::write(
        &path,
        r#"# Per line-class fastener and gasket defaults. The DEFAULT row is
# required; it closes the resolution chain for tasks without a line class.
rows:
  - line_class: DEFAULT
    bolt_material: "A193 B7"
    gasket_type: spiral_wound
"#,
    )
    .into_diagnostic()
}

fn print_structure(root: &Path) {
    let dirs = [
        ".camber/",
        ".camber/config.yaml",
        "catalog/parts/",
        "catalog/templates/",
        "catalog/standards.yaml",
        "tasks/",
        "constraints/",
        "reviews/",
        "patterns/",
        "corpus/",
        "reports/",
    ];

    for dir in dirs {
        if root.join(dir).exists() {
            println!("  {}", style(dir).dim());
        }
    }
}
