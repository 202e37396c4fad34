//! Operator prompts
//!
//! [`Prompter`] is the seam between the interactive planner and the
//! terminal. Every answer goes through the same parsers whichever
//! implementation is used, so a rejected answer is asked again on a
//! terminal and skipped over in a script.

use crate::error::InitError;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Answer validator for free-form questions
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

pub trait Prompter {
    /// Pick one of `choices`; an empty answer selects `default`
    fn ask_choice(&mut self, question: &str, choices: &[&str], default: &str) -> Result<String, InitError>;

    fn ask_bool(&mut self, question: &str, default: bool) -> Result<bool, InitError>;

    /// Free-form answer checked by `validate`; an empty answer selects `default`
    fn ask_string(&mut self, question: &str, default: &str, validate: Validator<'_>) -> Result<String, InitError>;

    /// Integer in `min..=max`; an empty answer selects `default`
    fn ask_int(&mut self, question: &str, min: i64, max: i64, default: i64) -> Result<i64, InitError>;

    /// Hidden input; may be empty
    fn ask_password(&mut self, question: &str) -> Result<String, InitError>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn ask_choice(&mut self, question: &str, choices: &[&str], default: &str) -> Result<String, InitError> {
        (**self).ask_choice(question, choices, default)
    }

    fn ask_bool(&mut self, question: &str, default: bool) -> Result<bool, InitError> {
        (**self).ask_bool(question, default)
    }

    fn ask_string(&mut self, question: &str, default: &str, validate: Validator<'_>) -> Result<String, InitError> {
        (**self).ask_string(question, default, validate)
    }

    fn ask_int(&mut self, question: &str, min: i64, max: i64, default: i64) -> Result<i64, InitError> {
        (**self).ask_int(question, min, max, default)
    }

    fn ask_password(&mut self, question: &str) -> Result<String, InitError> {
        (**self).ask_password(question)
    }
}

pub fn parse_choice(answer: &str, choices: &[&str], default: &str) -> Result<String, String> {
    let answer = answer.trim();
    let answer = if answer.is_empty() { default } else { answer };
    if choices.contains(&answer) {
        Ok(answer.to_string())
    } else {
        Err(format!("'{}' is not one of: {}", answer, choices.join(", ")))
    }
}

pub fn parse_bool(answer: &str, default: bool) -> Result<bool, String> {
    match answer.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "yes" | "y" => Ok(true),
        "no" | "n" => Ok(false),
        other => Err(format!("'{}' is not yes or no", other)),
    }
}

pub fn parse_string(answer: &str, default: &str, validate: Validator<'_>) -> Result<String, String> {
    let answer = answer.trim();
    let answer = if answer.is_empty() { default } else { answer };
    validate(answer)?;
    Ok(answer.to_string())
}

pub fn parse_int(answer: &str, min: i64, max: i64, default: i64) -> Result<i64, String> {
    let answer = answer.trim();
    let value = if answer.is_empty() {
        default
    } else {
        answer
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not a number", answer))?
    };
    if value < min || value > max {
        return Err(format!("{} is not between {} and {}", value, min, max));
    }
    Ok(value)
}

fn bool_hint(default: bool) -> &'static str {
    if default { "[default=yes]" } else { "[default=no]" }
}

/// Prompts on a terminal, re-asking until the answer is valid
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

    fn read_answer(&mut self, prompt: &str) -> Result<String, InitError> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InitError::Prompt("unexpected end of input".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn ask<T>(&mut self, prompt: &str, parse: impl Fn(&str) -> Result<T, String>) -> Result<T, InitError> {
        loop {
            let answer = self.read_answer(prompt)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(reason) => writeln!(self.output, "Invalid input: {}", reason)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask_choice(&mut self, question: &str, choices: &[&str], default: &str) -> Result<String, InitError> {
        let prompt = format!("{} ({}) [default={}]: ", question, choices.join(", "), default);
        self.ask(&prompt, |a| parse_choice(a, choices, default))
    }

    fn ask_bool(&mut self, question: &str, default: bool) -> Result<bool, InitError> {
        let prompt = format!("{} (yes/no) {}: ", question, bool_hint(default));
        self.ask(&prompt, |a| parse_bool(a, default))
    }

    fn ask_string(&mut self, question: &str, default: &str, validate: Validator<'_>) -> Result<String, InitError> {
        let prompt = if default.is_empty() {
            format!("{}: ", question)
        } else {
            format!("{} [default={}]: ", question, default)
        };
        self.ask(&prompt, |a| parse_string(a, default, validate))
    }

    fn ask_int(&mut self, question: &str, min: i64, max: i64, default: i64) -> Result<i64, InitError> {
        let prompt = format!("{} [default={}]: ", question, default);
        self.ask(&prompt, |a| parse_int(a, min, max, default))
    }

    fn ask_password(&mut self, question: &str) -> Result<String, InitError> {
        loop {
            let first = rpassword::prompt_password(format!("{}: ", question))?;
            let again = rpassword::prompt_password("Again: ")?;
            if first == again {
                return Ok(first);
            }
            writeln!(self.output, "Invalid input: passwords don't match")?;
        }
    }
}

/// Replays canned answers in order
///
/// Answers rejected by a parser are recorded and the next answer is tried,
/// the way a terminal user would retype. Running out of answers is an error.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
    rejected: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Answers that failed validation
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn ask<T>(&mut self, question: &str, parse: impl Fn(&str) -> Result<T, String>) -> Result<T, InitError> {
        self.asked.push(question.to_string());
        loop {
            let answer = self
                .answers
                .pop_front()
                .ok_or_else(|| InitError::Prompt(format!("no answer left for: {}", question)))?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(_) => self.rejected.push(answer),
            }
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask_choice(&mut self, question: &str, choices: &[&str], default: &str) -> Result<String, InitError> {
        self.ask(question, |a| parse_choice(a, choices, default))
    }

    fn ask_bool(&mut self, question: &str, default: bool) -> Result<bool, InitError> {
        self.ask(question, |a| parse_bool(a, default))
    }

    fn ask_string(&mut self, question: &str, default: &str, validate: Validator<'_>) -> Result<String, InitError> {
        self.ask(question, |a| parse_string(a, default, validate))
    }

    fn ask_int(&mut self, question: &str, min: i64, max: i64, default: i64) -> Result<i64, InitError> {
        self.ask(question, |a| parse_int(a, min, max, default))
    }

    fn ask_password(&mut self, question: &str) -> Result<String, InitError> {
        self.ask(question, |a| Ok(a.to_string()))
    }
}
