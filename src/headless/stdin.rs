//! Line commands read from stdin in interactive headless mode
//!
//! ```text
//! context api-review      section core        tag lang:rust
//! mode ai-interaction:ask provider claude.cli  task fix the flaky test
//! branch main             lib tiktoken        encoder cl100k
//! limit 64000             setting claude.cli model=opus
//! reload   detect   generate   send   clear-tags   quit
//! ```

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use lgc_app::domain::*;
use lgc_app::Command;

/// A parsed stdin line
#[derive(Debug)]
pub enum StdinRequest {
    Dispatch(Command),
    Quit,
}

fn split_pair<'a>(value: &'a str, separator: char, usage: &str) -> Result<(&'a str, &'a str), String> {
    value
        .split_once(separator)
        .filter(|(a, b)| !a.is_empty() && !b.is_empty())
        .ok_or_else(|| format!("expected {usage}"))
}

/// Parse one line; `Ok(None)` for blank lines
pub fn parse_line(line: &str) -> Result<Option<StdinRequest>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "q" | "quit" => return Ok(Some(StdinRequest::Quit)),
        "reload" => RELOAD_CATALOGS.command(),
        "detect" => DETECT_TARGETS.command(),
        "generate" => GENERATE_LISTING.command(),
        "send" => SEND_LISTING.command(),
        "clear-tags" => CLEAR_TAGS.command(),
        "context" => SELECT_CONTEXT.create(rest.to_string()),
        "section" => SELECT_SECTION.create(rest.to_string()),
        "provider" => SELECT_PROVIDER.create(rest.to_string()),
        "task" => SET_TASK_TEXT.create(rest.to_string()),
        "branch" => SELECT_BRANCH.create(rest.to_string()),
        "lib" => SELECT_TOKENIZER_LIB.create(rest.to_string()),
        "encoder" => SELECT_ENCODER.create(rest.to_string()),
        "limit" => {
            let limit = rest
                .parse::<u64>()
                .map_err(|e| format!("invalid limit '{rest}': {e}"))?;
            SET_CTX_LIMIT.create(limit)
        }
        "tag" => {
            let (set, tag) = split_pair(rest, ':', "tag SET:TAG")?;
            TOGGLE_TAG.create(TagToggle::new(set, tag))
        }
        "mode" => {
            let (set, mode) = split_pair(rest, ':', "mode SET:MODE")?;
            SELECT_MODE.create(ModeSelection::new(set, mode))
        }
        "setting" => {
            let (provider, assignment) = rest
                .split_once(char::is_whitespace)
                .ok_or("expected setting PROVIDER KEY=VALUE")?;
            let (key, value) = assignment
                .trim()
                .split_once('=')
                .ok_or("expected setting PROVIDER KEY=VALUE")?;
            SET_PROVIDER_SETTING.create(ProviderSetting {
                provider: provider.to_string(),
                key: key.to_string(),
                value: Some(value.to_string()).filter(|v| !v.is_empty()),
            })
        }
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(StdinRequest::Dispatch(command)))
}

/// Read stdin until EOF or `quit` (blocking; run on its own thread)
pub fn read_stdin_blocking(tx: mpsc::Sender<StdinRequest>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(request)) => {
                let quit = matches!(request, StdinRequest::Quit);
                if tx.blocking_send(request).is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => warn!("Stdin: {}", message),
        }
    }
    info!("Stdin reader exiting");
}
