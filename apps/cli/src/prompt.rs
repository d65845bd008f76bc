//! Interactive prompts.

use std::io::{self, BufRead, Write};

/// Source of interactive answers. The terminal in production, a script in tests.
pub trait Prompter {
    /// Asks for one line of input. `initial` is returned for an empty answer.
    fn input(&mut self, message: &str, initial: Option<&str>) -> io::Result<String>;

    /// Asks a yes/no question.
    fn confirm(&mut self, message: &str) -> io::Result<bool>;

    /// Asks the user to pick one of `choices`; returns the chosen value.
    fn select(&mut self, message: &str, choices: &[&str]) -> io::Result<String>;
}

/// Re-asks until `validate` accepts the answer.
pub fn ask<T>(
    prompter: &mut dyn Prompter,
    message: &str,
    initial: Option<&str>,
    validate: impl Fn(&str) -> Result<T, String>,
) -> io::Result<T> {
    loop {
        let answer = prompter.input(message, initial)?;
        match validate(answer.trim()) {
            Ok(value) => return Ok(value),
            Err(reason) => println!("  {reason}"),
        }
    }
}

/// Prompts on stdin/stdout.
pub struct StdioPrompter<R> {
    input: R,
}

impl StdioPrompter<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self {
            input: io::BufReader::new(io::stdin()),
        }
    }
}

impl<R: BufRead> StdioPrompter<R> {
    fn read_line(&mut self) -> io::Result<String> {
        io::stdout().flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while prompting",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<R: BufRead> Prompter for StdioPrompter<R> {
    fn input(&mut self, message: &str, initial: Option<&str>) -> io::Result<String> {
        match initial {
            Some(initial) => print!("? {message} ({initial}) "),
            None => print!("? {message} "),
        }
        let line = self.read_line()?;
        match initial {
            Some(initial) if line.trim().is_empty() => Ok(initial.to_string()),
            _ => Ok(line),
        }
    }

    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        loop {
            print!("? {message} (Y / N) ");
            let line = self.read_line()?;
            match line.trim().chars().next() {
                Some('y' | 'Y') => return Ok(true),
                Some('n' | 'N') => return Ok(false),
                _ => println!("  Response must be either \"Y\" or \"N\""),
            }
        }
    }

    fn select(&mut self, message: &str, choices: &[&str]) -> io::Result<String> {
        loop {
            println!("? {message}");
            for (i, choice) in choices.iter().enumerate() {
                println!("  {}) {choice}", i + 1);
            }
            print!("  choice (1) ");
            let line = self.read_line()?;
            let line = line.trim();
            if line.is_empty()
                && let Some(first) = choices.first()
            {
                return Ok(first.to_string());
            }
            if let Some(choice) = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| choices.get(i))
            {
                return Ok(choice.to_string());
            }
            if let Some(choice) = choices.iter().find(|c| **c == line) {
                return Ok(choice.to_string());
            }
            println!("  Pick one of the listed options");
        }
    }
}
