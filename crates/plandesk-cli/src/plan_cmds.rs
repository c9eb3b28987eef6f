//! CLI handlers for `plandesk plan` subcommands.
//!
//! Implements:
//! - `plandesk plan list`              -- list plans in the working directory
//! - `plandesk plan show <filename>`   -- print one plan with its metadata
//! - `plandesk plan create <file>`     -- store a markdown file as a plan
//! - `plandesk plan delete <filename>` -- remove a plan

use std::path::Path;

use anyhow::{Context, Result};

use plandesk_core::plan::{self as plan_store, NewPlan, PlanType};

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, working_dir: &Path) -> Result<()> {
    match command {
        PlanCommands::List => cmd_list(working_dir).await,
        PlanCommands::Show { filename } => cmd_show(working_dir, &filename).await,
        PlanCommands::Create {
            file,
            title,
            plan_type,
            session,
            tags,
        } => {
            let plan_type = plan_type
                .as_deref()
                .map(str::parse::<PlanType>)
                .transpose()?;
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read plan file: {file}"))?;
            let new = NewPlan {
                content,
                title,
                plan_type,
                session_id: session,
                tags,
            };
            cmd_create(working_dir, new).await
        }
        PlanCommands::Delete { filename } => cmd_delete(working_dir, &filename).await,
    }
}

// -----------------------------------------------------------------------
// plandesk plan list
// -----------------------------------------------------------------------

async fn cmd_list(working_dir: &Path) -> Result<()> {
    let plans = plan_store::list_plans(working_dir).await?;

    if plans.is_empty() {
        println!(
            "No plans in {}. Use `plandesk plan create <file>` to add one.",
            working_dir.display()
        );
        return Ok(());
    }

    let file_w = plans
        .iter()
        .map(|p| p.filename.len())
        .max()
        .unwrap_or(8)
        .max(8);
    // Longest type name is "implementation".
    let type_w = 14;

    println!(
        "{:<file_w$}  {:<type_w$}  {:<16}  TITLE",
        "FILENAME", "TYPE", "UPDATED",
    );
    for plan in &plans {
        let updated = plan.updated_at.format("%Y-%m-%d %H:%M");
        println!(
            "{:<file_w$}  {:<type_w$}  {:<16}  {}",
            plan.filename,
            plan.plan_type.to_string(),
            updated.to_string(),
            plan.title,
        );
    }
    println!();
    println!("{} plan(s) in {}", plans.len(), working_dir.display());

    Ok(())
}

// -----------------------------------------------------------------------
// plandesk plan show <filename>
// -----------------------------------------------------------------------

async fn cmd_show(working_dir: &Path, filename: &str) -> Result<()> {
    let plan = plan_store::load_plan(working_dir, filename).await?;

    println!("Plan: {}", plan.title);
    println!("  File:     {}", plan.filename);
    println!("  ID:       {}", plan.id);
    println!("  Type:     {}", plan.plan_type);
    if let Some(session) = &plan.session_id {
        println!("  Session:  {session}");
    }
    if !plan.tags.is_empty() {
        println!("  Tags:     {}", plan.tags.join(", "));
    }
    println!("  Created:  {}", plan.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:  {}", plan.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!();
    println!("{}", plan.content);

    Ok(())
}

// -----------------------------------------------------------------------
// plandesk plan create <file>
// -----------------------------------------------------------------------

async fn cmd_create(working_dir: &Path, new: NewPlan) -> Result<()> {
    let plan = plan_store::save_plan(working_dir, new).await?;

    println!("Plan created successfully.");
    println!();
    println!("  File:  {}", plan.filename);
    println!("  Title: {}", plan.title);
    println!("  Type:  {}", plan.plan_type);
    println!("  Dir:   {}", plan_store::plans_dir(working_dir).display());

    Ok(())
}

// -----------------------------------------------------------------------
// plandesk plan delete <filename>
// -----------------------------------------------------------------------

async fn cmd_delete(working_dir: &Path, filename: &str) -> Result<()> {
    plan_store::delete_plan(working_dir, filename).await?;
    println!("Plan {filename} deleted.");
    Ok(())
}
