//! Filesystem-backed plan persistence.
//!
//! Plans live in `<working_dir>/.plans/<filename>.md`. Writes go to a hidden
//! temporary sibling and are renamed into place, so readers never see a
//! partially written file. Concurrent writers to the same filename are not
//! serialized: the last rename wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::detect::{detect_plan_type, extract_title_from_content, slugify};
use super::frontmatter::{self, PlanFrontmatter};
use super::model::{NewPlan, Plan, PlanSummary, PlanUpdate};

/// Name of the directory, inside a working directory, that holds plans.
pub const PLANS_DIR: &str = ".plans";

/// Errors raised by plan store operations.
#[derive(Debug, Error)]
pub enum PlanStoreError {
    #[error("plan not found: {0}")]
    NotFound(String),

    #[error("invalid plan filename {0:?}")]
    InvalidFilename(String),

    #[error("plan content must not be empty")]
    EmptyContent,

    #[error("malformed frontmatter in {filename}: {source}")]
    Frontmatter {
        filename: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize plan metadata: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlanStoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory holding the plans of `working_dir`.
pub fn plans_dir(working_dir: &Path) -> PathBuf {
    working_dir.join(PLANS_DIR)
}

/// Check that `filename` names a visible `.md` file directly inside the
/// plans directory.
pub fn validate_filename(filename: &str) -> Result<(), PlanStoreError> {
    let ok = filename.len() > ".md".len()
        && filename.ends_with(".md")
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\', '\0'])
        && !filename.contains("..");
    if ok {
        Ok(())
    } else {
        Err(PlanStoreError::InvalidFilename(filename.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Persist a new plan and return it.
///
/// Title and type are derived from the content when not supplied. The
/// filename is `<slug-of-title>-<8 hex of id>.md`.
pub async fn save_plan(working_dir: &Path, new: NewPlan) -> Result<Plan, PlanStoreError> {
    if new.content.trim().is_empty() {
        return Err(PlanStoreError::EmptyContent);
    }

    let dir = plans_dir(working_dir);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| PlanStoreError::io(&dir, e))?;

    let title = non_blank(new.title).unwrap_or_else(|| extract_title_from_content(&new.content));
    let plan_type = new
        .plan_type
        .unwrap_or_else(|| detect_plan_type(&new.content));

    let slug = slugify(&title);
    let (id, filename) = loop {
        let id = Uuid::new_v4();
        let filename = format!("{slug}-{}.md", &id.simple().to_string()[..8]);
        let taken = fs::try_exists(dir.join(&filename))
            .await
            .map_err(|e| PlanStoreError::io(&dir, e))?;
        if !taken {
            break (id, filename);
        }
    };

    let now = Utc::now();
    let plan = Plan {
        id,
        filename,
        title,
        plan_type,
        session_id: non_blank(new.session_id),
        tags: new.tags.iter().map(|t| single_line(t)).collect(),
        content: new.content,
        working_dir: working_dir.to_path_buf(),
        created_at: now,
        updated_at: now,
    };

    write_plan(&dir, &plan).await?;
    info!(
        filename = %plan.filename,
        plan_type = %plan.plan_type,
        working_dir = %working_dir.display(),
        "plan saved"
    );
    Ok(plan)
}

/// Load a single plan by filename.
pub async fn load_plan(working_dir: &Path, filename: &str) -> Result<Plan, PlanStoreError> {
    validate_filename(filename)?;
    let path = plans_dir(working_dir).join(filename);
    let plan = read_plan(working_dir, &path, filename).await?;
    debug!(filename, "plan loaded");
    Ok(plan)
}

/// Summaries of every plan under `working_dir`, most recently updated first.
///
/// A missing plans directory yields an empty list. Unreadable or malformed
/// files are skipped with a warning.
pub async fn list_plans(working_dir: &Path) -> Result<Vec<PlanSummary>, PlanStoreError> {
    let dir = plans_dir(working_dir);
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PlanStoreError::io(&dir, e)),
    };

    let mut plans = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PlanStoreError::io(&dir, e))?
    {
        let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if validate_filename(&filename).is_err() {
            continue;
        }
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        match read_plan(working_dir, &entry.path(), &filename).await {
            Ok(plan) => plans.push(PlanSummary::from(plan)),
            Err(e) => warn!(filename, error = %e, "skipping unreadable plan"),
        }
    }

    plans.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.filename.cmp(&b.filename))
    });
    debug!(count = plans.len(), dir = %dir.display(), "plans listed");
    Ok(plans)
}

/// Rewrite an existing plan's content (and optionally its title).
///
/// Id, type, session, tags and creation time are carried over from the
/// stored version.
pub async fn update_plan(
    working_dir: &Path,
    filename: &str,
    update: PlanUpdate,
) -> Result<Plan, PlanStoreError> {
    if update.content.trim().is_empty() {
        return Err(PlanStoreError::EmptyContent);
    }
    let existing = load_plan(working_dir, filename).await?;

    let plan = Plan {
        title: non_blank(update.title).unwrap_or(existing.title),
        content: update.content,
        updated_at: Utc::now(),
        ..existing
    };

    write_plan(&plans_dir(working_dir), &plan).await?;
    info!(filename, working_dir = %working_dir.display(), "plan updated");
    Ok(plan)
}

/// Remove a plan file.
pub async fn delete_plan(working_dir: &Path, filename: &str) -> Result<(), PlanStoreError> {
    validate_filename(filename)?;
    let path = plans_dir(working_dir).join(filename);
    match fs::remove_file(&path).await {
        Ok(()) => {
            info!(filename, working_dir = %working_dir.display(), "plan deleted");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(PlanStoreError::NotFound(filename.to_string()))
        }
        Err(e) => Err(PlanStoreError::io(&path, e)),
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

async fn read_plan(
    working_dir: &Path,
    path: &Path,
    filename: &str,
) -> Result<Plan, PlanStoreError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PlanStoreError::NotFound(filename.to_string()));
        }
        Err(e) => return Err(PlanStoreError::io(path, e)),
    };

    if let Some((block, body)) = frontmatter::split(&raw) {
        let meta = frontmatter::parse(block).map_err(|source| PlanStoreError::Frontmatter {
            filename: filename.to_string(),
            source,
        })?;
        return Ok(Plan {
            id: meta.id,
            filename: filename.to_string(),
            title: meta.title,
            plan_type: meta.plan_type,
            session_id: meta.session_id,
            tags: meta.tags,
            content: body.to_string(),
            working_dir: working_dir.to_path_buf(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        });
    }

    // Plain markdown dropped into the directory by hand: derive everything.
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| PlanStoreError::io(path, e))?;
    let modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());
    let created: DateTime<Utc> = metadata.created().map(DateTime::from).unwrap_or(modified);

    Ok(Plan {
        id: Uuid::new_v5(&Uuid::NAMESPACE_URL, filename.as_bytes()),
        filename: filename.to_string(),
        title: extract_title_from_content(&raw),
        plan_type: detect_plan_type(&raw),
        session_id: None,
        tags: Vec::new(),
        content: raw,
        working_dir: working_dir.to_path_buf(),
        created_at: created,
        updated_at: modified,
    })
}

async fn write_plan(dir: &Path, plan: &Plan) -> Result<(), PlanStoreError> {
    let meta = PlanFrontmatter {
        id: plan.id,
        title: plan.title.clone(),
        plan_type: plan.plan_type,
        session_id: plan.session_id.clone(),
        tags: plan.tags.clone(),
        created_at: plan.created_at,
        updated_at: plan.updated_at,
    };
    let contents = frontmatter::render(&meta, &plan.content)?;

    let target = dir.join(&plan.filename);
    let tmp = dir.join(format!(".{}.{}.tmp", plan.filename, Uuid::new_v4().simple()));
    fs::write(&tmp, contents)
        .await
        .map_err(|e| PlanStoreError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, &target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PlanStoreError::io(&target, e));
    }
    Ok(())
}

/// Trimmed, single-line label, or `None` when nothing is left.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| single_line(&v)).filter(|v| !v.is_empty())
}

/// Join the non-empty lines of `value` with single spaces. Titles, sessions
/// and tags are labels; a line break in one would end the frontmatter early.
fn single_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
