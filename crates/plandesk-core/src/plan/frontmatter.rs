//! TOML frontmatter codec for plan files.
//!
//! A plan file is a `+++`-delimited TOML block followed by the markdown body:
//!
//! ```text
//! +++
//! id = "…"
//! title = "…"
//! type = "implementation"
//! tags = []
//! created_at = "…"
//! updated_at = "…"
//! +++
//! # Body
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::PlanType;

const DELIMITER: &str = "+++";

/// Metadata stored at the top of every plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFrontmatter {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Split a raw file into `(frontmatter, body)`.
///
/// Returns `None` when the file does not open with a `+++` line or the
/// block is never closed.
pub fn split(raw: &str) -> Option<(&str, &str)> {
    let rest = raw
        .strip_prefix("+++\n")
        .or_else(|| raw.strip_prefix("+++\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse the TOML block produced by [`split`].
pub fn parse(block: &str) -> Result<PlanFrontmatter, toml::de::Error> {
    toml::from_str(block)
}

/// Render frontmatter and body back into file contents.
pub fn render(meta: &PlanFrontmatter, body: &str) -> Result<String, toml::ser::Error> {
    let block = toml::to_string(meta)?;
    let mut out = String::with_capacity(block.len() + body.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&block);
    if !block.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlanFrontmatter {
        let now = Utc::now();
        PlanFrontmatter {
            id: Uuid::new_v4(),
            title: "Add \"quoted\" login".into(),
            plan_type: PlanType::Implementation,
            session_id: None,
            tags: vec!["auth".into(), "backend".into(), "auth".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn render_then_split_preserves_body_exactly() {
        let meta = sample();
        let body = "\n# Title\n\n+++ not a delimiter\ntrailing";
        let raw = render(&meta, body).unwrap();

        let (block, parsed_body) = split(&raw).expect("frontmatter present");
        assert_eq!(parsed_body, body);
        assert_eq!(parse(block).unwrap(), meta);
    }

    #[test]
    fn absent_session_is_omitted() {
        let raw = render(&sample(), "").unwrap();
        assert!(!raw.contains("session_id"));
        assert!(raw.contains("type = \"implementation\""));
    }

    #[test]
    fn split_handles_crlf() {
        let raw = "+++\r\ntitle = \"x\"\r\n+++\r\nbody";
        let (block, body) = split(raw).unwrap();
        assert_eq!(block, "title = \"x\"\r\n");
        assert_eq!(body, "body");
    }

    #[test]
    fn split_rejects_plain_markdown_and_unclosed_blocks() {
        assert!(split("# Just markdown\n").is_none());
        assert!(split("+++\ntitle = \"x\"\n").is_none());
    }
}
