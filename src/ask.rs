//! One-shot question answering from the command line.

use anyhow::{Context, Result};
use std::path::Path;

use agromark_core::ConversationTurn;

use crate::app::App;
use crate::config::Config;

/// Read a JSON array of `{sender, text}` turns.
pub fn load_history(path: &Path) -> Result<Vec<ConversationTurn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))
}

/// Answer `query` and print the answer to stdout.
///
/// The agent never fails a question, so this only errors on setup
/// problems (unreadable history, unreachable database).
pub async fn run_ask(config: &Config, query: &str, history: Option<&Path>) -> Result<()> {
    let history = match history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let app = App::from_config(config).await?;
    let answer = app.agent.answer_query(query, &history).await;
    println!("{}", answer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agromark_core::Sender;

    #[test]
    fn test_load_history() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"[{"sender":"user","text":"oi"},{"sender":"bot","text":"olá!"}]"#,
        )
        .unwrap();

        let history = load_history(tmp.path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[1].sender, Sender::Agent);
    }

    #[test]
    fn test_load_history_rejects_garbage() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not json").unwrap();
        assert!(load_history(tmp.path()).is_err());
    }
}
