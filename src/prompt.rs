use crate::error::ErrorKind;
use anyhow::Context;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of operator answers.
pub trait Prompter {
    fn ask(&mut self, question: &str) -> anyhow::Result<String>;

    /// Only a lone `y` or `Y` counts as consent.
    fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("{} [y/N] ", question))?;
        Ok(is_affirmative(&answer))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        write!(self.output, "{}", question).context(ErrorKind::Interactive)?;
        self.output.flush().context(ErrorKind::Interactive)?;

        let mut answer = String::new();
        // EOF leaves the answer empty, which reads as a decline.
        self.input
            .read_line(&mut answer)
            .context(ErrorKind::Interactive)?;

        Ok(answer.trim().to_string())
    }
}

/// Answers from a fixed script; an exhausted script answers with an empty line.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}
