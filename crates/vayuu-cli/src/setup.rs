//! First-run setup
//!
//! Prompts for the settings `vayuu run` needs, writes the config file and
//! seeds the agent workspace with its template files.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, mask_secret, restrict_permissions};

const SOUL_TEMPLATE: &str = r#"# Soul

You are Vayuu, a calm and practical personal assistant.

- Be concise. Prefer short answers unless asked for detail.
- Ask before doing anything destructive in the workspace.
- Admit when you do not know something.
"#;

const USER_TEMPLATE: &str = r#"# User

Nothing is known about the user yet. Record stable facts here as you learn
them (name, location, work, preferences).
"#;

const SKILLS_README_TEMPLATE: &str = r#"# Skills

Each skill is a markdown file in this directory describing a repeatable
task and the commands it needs. No skills are installed yet.
"#;

/// Files seeded into a fresh workspace, relative to its root.
pub const WORKSPACE_TEMPLATES: &[(&str, &str)] = &[
    ("SOUL.md", SOUL_TEMPLATE),
    ("USER.md", USER_TEMPLATE),
    ("skills/readme.md", SKILLS_README_TEMPLATE),
];

/// Run the interactive wizard on stdin/stdout and save to `config_path`.
pub fn run_setup(config_path: &Path) -> Result<()> {
    println!("=== Vayuu Setup ===");
    println!("Press Enter to keep the value shown in brackets.");
    println!();

    let defaults = AppConfig::load_from_file(config_path).unwrap_or_default();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    let config = prompt_config(&mut input, &mut output, &defaults)?;
    config.validate()?;

    let workdir = config.workdir();
    create_private_dir(&workdir)?;
    config.save(config_path)?;
    println!("\nConfiguration saved to {}", config_path.display());

    match init_workspace(&workdir) {
        Ok(created) => {
            for path in created {
                println!("  initialized: {}", path.display());
            }
        }
        Err(e) => println!("Warning: failed to initialize templates: {e:#}"),
    }

    println!("\nSetup complete! Start the bot with: vayuu run");
    Ok(())
}

/// Collect every setting, falling back to `defaults` on empty input.
pub fn prompt_config<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    defaults: &AppConfig,
) -> Result<AppConfig> {
    let mut config = defaults.clone();
    let (api_key_default, api_key_shown) = if defaults.api_key.is_empty() {
        ("ollama", "ollama".to_string())
    } else {
        (defaults.api_key.as_str(), mask_secret(&defaults.api_key))
    };

    config.telegram_token = prompt_as(
        input,
        output,
        "Telegram Bot Token",
        &defaults.telegram_token,
        &mask_secret(&defaults.telegram_token),
    )?;
    config.allowed_username = prompt(
        input,
        output,
        "Allowed Telegram Username (without @)",
        &defaults.allowed_username,
    )?
    .trim_start_matches('@')
    .to_string();
    config.api_key = prompt_as(
        input,
        output,
        "API Key (OpenAI-compatible; keep the default for Ollama)",
        api_key_default,
        &api_key_shown,
    )?;
    config.api_base_url = prompt(input, output, "API Base URL", &defaults.api_base_url)?;
    config.model = prompt(input, output, "Model Name", &defaults.model)?;
    config.agent_workdir = prompt(input, output, "Agent Work Directory", &defaults.agent_workdir)?;
    Ok(config)
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
) -> Result<String> {
    prompt_as(input, output, label, default, default)
}

/// Like [`prompt`], showing `shown` in place of the default value.
fn prompt_as<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
    shown: &str,
) -> Result<String> {
    if shown.is_empty() {
        write!(output, "{label}: ")?;
    } else {
        write!(output, "{label} [{shown}]: ")?;
    }
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read input")?;
    let value = line.trim();
    Ok(if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    })
}

fn create_private_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    restrict_permissions(path, 0o700)
}

/// Seed the workspace templates and the `memory/` log directory.
///
/// Existing files are left untouched. Returns the files that were written.
pub fn init_workspace(workdir: &Path) -> Result<Vec<PathBuf>> {
    create_private_dir(&workdir.join("memory"))?;

    let mut created = Vec::new();
    for (relative, content) in WORKSPACE_TEMPLATES {
        let target = workdir.join(relative);
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            create_private_dir(parent)?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        created.push(target);
    }
    Ok(created)
}
