use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Files from the workspace root appended to the system prompt when present.
pub const WORKSPACE_PROMPT_FILES: &[&str] = &["SOUL.md", "USER.md"];

/// Upper bound for a single workspace prompt file.
const MAX_PROMPT_FILE_BYTES: u64 = 64 * 1024;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Vayuu, a personal assistant that lives in the user's chat app and works inside a private workspace directory.

## Who you are and who you help
- `SOUL.md` describes your identity, behaviour and limits. Follow it.
- `USER.md` holds what you have learned about the user.
- `memory/YYYY-MM-DD.jsonl` is today's conversation log. Read it when earlier context matters.

## Tools and skills
- `skills/readme.md` lists the skills available in the workspace. Check it before attempting complex tasks.
- Use `execute_command` for short shell commands only.
- Use `send_file` to deliver a file from the workspace to the user.

## Keeping knowledge current
- Update `SOUL.md` when the user changes something about you.
- Update `USER.md` when you learn something specific about the user.
- Always end with a reply to the user."#;

/// Base prompt followed by one `## <file>` section per workspace prompt file.
///
/// Missing or empty files are skipped. Read errors are logged and skipped.
pub fn build_system_prompt(base: &str, workspace: Option<&Path>) -> String {
    let mut sections = vec![base.trim().to_string()];

    if let Some(root) = workspace {
        for name in WORKSPACE_PROMPT_FILES {
            let path = root.join(name);
            match read_prompt_file(&path) {
                Ok(Some(content)) => {
                    debug!(file = %path.display(), bytes = content.len(), "Loaded prompt file");
                    sections.push(format!("## {name}\n\n{content}"));
                }
                Ok(None) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to read prompt file"),
            }
        }
    }

    sections.join("\n\n")
}

fn read_prompt_file(path: &Path) -> std::io::Result<Option<String>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut content = fs::read_to_string(path)?;
    if metadata.len() > MAX_PROMPT_FILE_BYTES {
        let mut cut = MAX_PROMPT_FILE_BYTES as usize;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        content.truncate(cut);
    }

    let trimmed = content.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
