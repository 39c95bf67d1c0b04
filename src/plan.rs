//! Task-plan generation.
//!
//! ```text
//! query ─▶ search_code_base ─▶ format_code_context ─▶ render_prompt
//!                                                         │
//!            markdown artifact ◀── chat completion ◀──────┘
//! ```
//!
//! The system message is the instructional template with the matched files
//! spliced in at `{code}`; the user message is the raw query.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::chat::{AzureChatClient, ChatCompleter};
use crate::config::{Config, PlanConfig};
use crate::embedding::{AzureEmbedder, Embedder};
use crate::models::CodeFileMatch;
use crate::search::search_code_base;
use crate::vector_store::{self, VectorStore};

/// Placeholder replaced by the formatted code context.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Built-in instructions, used unless `[plan].template_path` is set.
pub const DEFAULT_TEMPLATE: &str = r#"### Task Planning

#### Objective
Analyze the provided codebase context and user task to generate a structured
implementation plan. Consider dependencies, required changes, and
implementation steps.

#### Relevant Code snippets
{code}

#### Output Requirements

1. **Project Blueprint**
   - Define core models with their relationships (1:1, 1:M, M:M)
   - Specify where each new module belongs in the existing layout

2. **Model Definitions**
   - Fields, types, defaults and constraints for every new or changed model

3. **Implementation Checklist and detailed code changes**
   - Ordered steps, each naming the files it touches
   - Follow the conventions visible in the code snippets above: layering,
     naming, error types and test placement
"#;

/// Result of one planning run.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub plan: String,
    pub code_context: String,
    pub saved_to: PathBuf,
}

/// Render matches as fenced blocks, one per file.
pub fn format_code_context(matches: &[CodeFileMatch], fence_lang: &str) -> String {
    matches
        .iter()
        .map(|m| {
            format!(
                "File: {}\n```{}\n{}\n```\n",
                m.file_path, fence_lang, m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splice `code_context` into `template`.
pub fn render_prompt(template: &str, code_context: &str) -> String {
    template.replace(CODE_PLACEHOLDER, code_context)
}

/// Load the template configured in `[plan]`, falling back to the built-in.
pub fn load_template(config: &PlanConfig) -> Result<String> {
    match &config.template_path {
        Some(path) => {
            let template = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;
            if !template.contains(CODE_PLACEHOLDER) {
                bail!(
                    "Prompt template {} has no {} placeholder",
                    path.display(),
                    CODE_PLACEHOLDER
                );
            }
            Ok(template)
        }
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// Markdown body of a saved query.
pub fn render_markdown(
    query: &str,
    task_plan: &str,
    code_context: &str,
    now: DateTime<Local>,
) -> String {
    format!(
        "# Task Query - {}\n\n## User Query\n{}\n\n## Task Plan\n{}\n\n## Relevant Code Context\n{}\n",
        now.format("%Y-%m-%d %H:%M:%S"),
        query,
        task_plan,
        code_context
    )
}

/// Write `query_{YYYYmmdd_HHMMSS}.md` under `dir`, creating it if needed.
pub fn save_query_and_response(
    dir: &Path,
    query: &str,
    task_plan: &str,
    code_context: &str,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create queries directory: {}", dir.display()))?;

    let filename = dir.join(format!("query_{}.md", now.format("%Y%m%d_%H%M%S")));
    std::fs::write(
        &filename,
        render_markdown(query, task_plan, code_context, now),
    )
    .with_context(|| format!("Failed to write {}", filename.display()))?;

    Ok(filename)
}

/// Search, prompt, and persist. Any failure aborts the whole run.
pub async fn generate_task_plan(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    chat: &dyn ChatCompleter,
    config: &PlanConfig,
    query: &str,
    limit: usize,
) -> Result<TaskPlan> {
    let template = load_template(config)?;

    tracing::info!("searching for relevant code files");
    let matches = search_code_base(embedder, store, query, limit).await?;
    let code_context = format_code_context(&matches, &config.code_fence_lang);
    let system_prompt = render_prompt(&template, &code_context);

    tracing::info!(context_files = matches.len(), "generating task plan");
    let plan = chat
        .complete(&system_prompt, query)
        .await
        .context("Failed to get chat completion")?;

    let saved_to =
        save_query_and_response(&config.queries_dir, query, &plan, &code_context, Local::now())?;

    Ok(TaskPlan {
        plan,
        code_context,
        saved_to,
    })
}

/// `codeplan plan` entry point.
pub async fn run_plan(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Task description must not be empty");
    }

    let embedder = AzureEmbedder::from_config(&config.embedding)?;
    let chat = AzureChatClient::from_config(&config.chat)?;
    let store = vector_store::open_store(config).await?;

    let result = generate_task_plan(
        &embedder,
        store.as_ref(),
        &chat,
        &config.plan,
        query,
        config.search.limit,
    )
    .await?;

    let rule = "=".repeat(80);
    println!("\nQuery and response saved to: {}", result.saved_to.display());
    println!("\nTask Plan:");
    println!("{}", rule);
    println!("{}", result.plan);
    println!("{}", rule);
    Ok(())
}
