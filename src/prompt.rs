use std::io::{self, BufRead, Write};

/// Asks the user to approve a destructive step.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// `y` or `yes`, any case, surrounding whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Prompts on stderr and reads one line from stdin, unless `--yes` was given.
pub struct ConsolePrompt {
    assume_yes: bool,
}

impl ConsolePrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for ConsolePrompt {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.assume_yes {
            tracing::info!(question, "confirmed by --yes");
            return Ok(true);
        }

        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} [y/N] ")?;
        stderr.flush()?;

        let mut answer = String::new();
        // EOF leaves the answer empty, which reads as "no".
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}
