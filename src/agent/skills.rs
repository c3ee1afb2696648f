//! `SkillManager`: discovers named skill directories under a well-known
//! root. Each skill is a directory containing `SKILL.md` with YAML
//! front-matter (`name`, `description`). Discovery is idempotent and cached
//! on first call.

use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

#[derive(Debug, Clone)]
pub struct SkillMeta {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
}

#[derive(Debug, serde::Deserialize)]
struct Frontmatter {
    name: String,
    #[serde(default)]
    description: String,
}

pub struct SkillManager {
    root: PathBuf,
    cache: OnceCell<Vec<SkillMeta>>,
}

impl SkillManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: OnceCell::new(),
        }
    }

    /// Discovers skills, computing the list exactly once per instance and
    /// serving every subsequent call from the cache.
    pub async fn list_skills(&self) -> &[SkillMeta] {
        self.cache
            .get_or_init(|| async { discover(&self.root) })
            .await
    }

    /// Returns the full `SKILL.md` body for `name`, or `None` if unknown.
    pub async fn activate(&self, name: &str) -> Option<String> {
        let skills = self.list_skills().await;
        let meta = skills.iter().find(|s| s.name == name)?;
        std::fs::read_to_string(meta.path.join("SKILL.md")).ok()
    }

    pub async fn build_skills_summary(&self) -> String {
        let skills = self.list_skills().await;
        if skills.is_empty() {
            return String::new();
        }
        let mut out = String::from("<skills>\n");
        for s in skills {
            out.push_str(&format!(
                "  <skill name=\"{}\">{}</skill>\n",
                s.name, s.description
            ));
        }
        out.push_str("</skills>");
        out
    }
}

fn discover(root: &Path) -> Vec<SkillMeta> {
    let mut skills = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return skills;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let manifest = path.join("SKILL.md");
        let Ok(content) = std::fs::read_to_string(&manifest) else {
            continue;
        };
        let Some(meta) = parse_frontmatter(&content) else {
            continue;
        };
        skills.push(SkillMeta {
            name: meta.name,
            description: meta.description,
            path,
        });
    }
    skills.sort_by(|a, b| a.name.cmp(&b.name));
    skills
}

fn parse_frontmatter(content: &str) -> Option<Frontmatter> {
    let body = content.strip_prefix("---")?;
    let end = body.find("---")?;
    let yaml = &body[..end];
    serde_yaml_ng::from_str(yaml).ok()
}

/// Strips YAML front-matter, returning only the manifest body.
pub fn strip_frontmatter(content: &str) -> &str {
    let Some(body) = content.strip_prefix("---") else {
        return content;
    };
    match body.find("---") {
        Some(end) => body[end + 3..].trim_start_matches('\n'),
        None => content,
    }
}
