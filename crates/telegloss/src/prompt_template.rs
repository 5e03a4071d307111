use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

use crate::models::glossary::Glossary;
use crate::systems::System;

/// Number of existing terms listed in the system prompt
pub const PROMPT_TERM_LIMIT: usize = 20;

/// Get the path to the prompts directory
fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("prompts")
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render("inline_template", &context)
}

/// Render a template file, looked up in `src/prompts` when the path does not exist as given
pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    let file_path = if template_path.exists() {
        template_path
    } else {
        prompts_dir().join(template_path)
    };

    let template_content = fs::read_to_string(&file_path).map_err(|e| {
        TeraError::chain(format!("Failed to read template {}", file_path.display()), e)
    })?;
    load_prompt(&template_content, context_data)
}

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

/// Context of `system.md`: glossary size, the first terms, and the tool systems in use
#[derive(Clone, Debug, Serialize)]
pub struct GlossaryPrompt {
    term_count: usize,
    terms: Vec<String>,
    remaining: usize,
    systems: Vec<SystemInfo>,
}

impl GlossaryPrompt {
    pub fn new(glossary: &Glossary, systems: &[&dyn System]) -> Self {
        let terms: Vec<String> = glossary
            .terms()
            .take(PROMPT_TERM_LIMIT)
            .map(str::to_string)
            .collect();
        Self {
            term_count: glossary.len(),
            remaining: glossary.len().saturating_sub(terms.len()),
            terms,
            systems: systems
                .iter()
                .map(|system| SystemInfo {
                    name: system.name().to_string(),
                    description: system.description().to_string(),
                    instructions: system.instructions().to_string(),
                })
                .collect(),
        }
    }

    pub fn render(&self) -> Result<String, TeraError> {
        load_prompt_file("system.md", self)
    }
}
