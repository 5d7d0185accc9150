//! Prompt library for the recommendation service
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/efficio/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Prompt files are markdown with YAML frontmatter and `# System` / `# User`
//! sections. `{{var}}` placeholders are substituted at render time.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const RECOMMEND_EFFICIENCY: &str =
        include_str!("../../../prompts/recommend_efficiency.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Aggregate metrics summary → structured efficiency recommendations
    RecommendEfficiency,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecommendEfficiency => "recommend_efficiency",
        }
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::RecommendEfficiency => defaults::RECOMMEND_EFFICIENCY,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Decoding temperature suggested by the prompt author
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the system section with template variables replaced
    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        substitute(self.system_section().unwrap_or_default(), vars)
    }

    /// Render the user section (or the whole body when there is none)
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        substitute(self.user_section().unwrap_or(&self.content), vars)
    }
}

/// Prompt loader with optional override directory
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
}

impl PromptLibrary {
    /// Create a prompt library with the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self { override_dir: None }
    }

    /// Load a prompt (checking override first, then default)
    pub fn get(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::Config(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("efficio").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::Config(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::Config("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::Config(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

fn substitute(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}
