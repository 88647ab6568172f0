use super::Prompter;
use crate::error::PromptError;
use crate::progress::Progress;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Prompter reading answers from standard input
///
/// The progress spinner is hidden while a question is on screen.
#[derive(Clone)]
pub struct TerminalPrompter {
    progress: Progress,
}

impl TerminalPrompter {
    pub fn new(progress: Progress) -> Self {
        Self { progress }
    }

    async fn ask(&self, prompt: String, question: &str) -> Result<String, PromptError> {
        let progress = self.progress.clone();
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            progress.suspend(|| {
                let mut stdout = io::stdout().lock();
                write!(stdout, "{}", prompt)?;
                stdout.flush()?;

                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line)? == 0 {
                    return Err(PromptError::NoAnswer { question });
                }
                Ok(line.trim().to_string())
            })
        })
        .await
        .map_err(|e| PromptError::Io(io::Error::other(e)))?
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn confirm(&self, question: &str, subject: &str) -> Result<bool, PromptError> {
        let prompt = format!("{} {} {} (y/N) ", "?".yellow().bold(), subject.cyan(), question);
        let answer = self.ask(prompt, question).await?;
        Ok(parse_confirm(&answer))
    }

    async fn input(
        &self,
        question: &str,
        subject: &str,
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        let prompt = match default {
            Some(default) => format!(
                "{} {} {} ({}) ",
                "?".yellow().bold(),
                subject.cyan(),
                question,
                default.dimmed()
            ),
            None => format!("{} {} {} ", "?".yellow().bold(), subject.cyan(), question),
        };
        let answer = self.ask(prompt, question).await?;
        Ok(resolve_input(answer, default))
    }
}

fn parse_confirm(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

fn resolve_input(answer: String, default: Option<&str>) -> String {
    match default {
        Some(default) if answer.is_empty() => default.to_string(),
        _ => answer,
    }
}
