//! Import command implementations.

use crate::apply::{PlanAction, PlannedAction};
use crate::cli::ImportCommands;
use crate::cli::commands::Workspace;
use crate::error::Result;
use crate::import::{ImportWorkflow, UploadSummary};
use crate::model::{ApplyResult, ArchiveCandidate};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PreviewOutput<'a> {
    session_id: &'a str,
    count: usize,
    candidates: &'a [ArchiveCandidate],
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
    session_id: &'a str,
    #[serde(flatten)]
    result: &'a ApplyResult,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    session_id: &'a str,
    dry_run: bool,
    plan: &'a [PlannedAction],
}

#[derive(Serialize)]
struct ResultOutput<'a> {
    session_id: &'a str,
    result: Option<&'a ApplyResult>,
}

/// Execute import commands.
///
/// # Errors
///
/// Returns an error if the session is unknown, the archive is rejected or
/// the home directory is missing.
pub fn execute(command: &ImportCommands, workspace: &Workspace, json: bool) -> Result<()> {
    let store = workspace.store();
    let workflow = ImportWorkflow::new(&store);

    match command {
        ImportCommands::Upload { archive } => upload(&workflow, archive, json),
        ImportCommands::Preview { session } => preview(&workflow, workspace, session, json),
        ImportCommands::Apply {
            session,
            selection,
            dry_run,
        } => {
            if *dry_run {
                plan(&workflow, workspace, session, selection, json)
            } else {
                apply(&workflow, workspace, session, selection, json)
            }
        }
        ImportCommands::Result { session } => result(&workflow, session, json),
    }
}

fn upload(workflow: &ImportWorkflow<'_>, archive: &Path, json: bool) -> Result<()> {
    let summary: UploadSummary = workflow.upload_file(archive)?;

    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("{} Uploaded {}", "✓".green(), archive.display());
        println!("  Session: {}", summary.session_id.bold());
        println!(
            "  Extracted: {} file(s), {} importable item(s)",
            summary.extracted.files, summary.importable
        );
        println!();
        println!(
            "{}",
            format!("Next: job-backup import preview {}", summary.session_id).dimmed()
        );
    }

    Ok(())
}

fn preview(
    workflow: &ImportWorkflow<'_>,
    workspace: &Workspace,
    session: &str,
    json: bool,
) -> Result<()> {
    let hierarchy = workspace.hierarchy()?;
    let candidates = workflow.preview(session, &hierarchy)?;

    if json {
        let output = PreviewOutput {
            session_id: session.trim(),
            count: candidates.len(),
            candidates: &candidates,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Archive items ({} found):", candidates.len());
    println!();
    for candidate in &candidates {
        let indent = "  ".repeat(candidate.depth());
        let status = if candidate.is_synthetic() {
            if candidate.exists {
                "exists".dimmed()
            } else {
                "folder".cyan()
            }
        } else if candidate.unchanged {
            "unchanged".dimmed()
        } else if candidate.exists {
            "update".yellow()
        } else {
            "new".green()
        };
        let name = if candidate.is_container {
            candidate.leaf_name().bold().to_string()
        } else {
            candidate.leaf_name().to_string()
        };
        println!(
            "{indent}{name} {} {status}",
            format!("[{}]", candidate.kind_label()).dimmed()
        );
    }

    Ok(())
}

fn apply(
    workflow: &ImportWorkflow<'_>,
    workspace: &Workspace,
    session: &str,
    selection: &[String],
    json: bool,
) -> Result<()> {
    let mut hierarchy = workspace.hierarchy()?;
    let result = workflow.apply(session, selection, &mut hierarchy)?;

    if json {
        let output = ApplyOutput {
            session_id: session.trim(),
            result: &result,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

fn plan(
    workflow: &ImportWorkflow<'_>,
    workspace: &Workspace,
    session: &str,
    selection: &[String],
    json: bool,
) -> Result<()> {
    let hierarchy = workspace.hierarchy()?;
    let plan = workflow.plan(session, selection, &hierarchy)?;

    if json {
        let output = PlanOutput {
            session_id: session.trim(),
            dry_run: true,
            plan: &plan,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Dry run ({} item(s)):", plan.len());
    println!();
    for step in &plan {
        for folder in &step.creates_folders {
            println!("  {} {folder} {}", "+".cyan(), "[Folder]".dimmed());
        }
        match &step.action {
            PlanAction::Create => println!("  {} {}", "+".green(), step.full_name),
            PlanAction::Update => println!("  {} {}", "~".yellow(), step.full_name),
            PlanAction::Blocked { reason } => {
                println!("  {} {}", "✗".red(), step.full_name);
                println!("    {}", reason.dimmed());
            }
        }
    }

    Ok(())
}

fn result(workflow: &ImportWorkflow<'_>, session: &str, json: bool) -> Result<()> {
    let result = workflow.result(session)?;

    if json {
        let output = ResultOutput {
            session_id: session.trim(),
            result: result.as_ref(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if let Some(result) = result {
        print_result(&result);
    } else {
        println!("No apply has run for this session yet.");
    }

    Ok(())
}

fn print_result(result: &ApplyResult) {
    println!("Applied ({}):", result.applied_count());
    for name in &result.applied {
        println!("  {} {name}", "✓".green());
    }

    if !result.is_success() {
        println!();
        println!("Failures ({}):", result.failures_count());
        for failure in &result.failures {
            println!("  {} {}", "✗".red(), failure.full_name);
            println!("    {}", failure.error.dimmed());
        }
    }
}
