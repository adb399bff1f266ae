//! Line-oriented prompts.
//!
//! Every question is printed, one line is read back, and invalid answers are
//! asked again. End of input is reported as an `UnexpectedEof` error so a
//! closed stdin never spins.

use bedtime_core::{SummaryChoice, SummaryChooser};
use std::io::{self, BufRead, Write};
use std::ops::RangeInclusive;

/// A question-and-answer console over any reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a line of text.
    pub fn say(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", text.as_ref())
    }

    /// Print `prompt` and return the trimmed answer.
    pub fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until the answer is non-empty.
    pub fn ask_non_empty(&mut self, prompt: &str) -> io::Result<String> {
        loop {
            let answer = self.ask(prompt)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("Please enter something.")?;
        }
    }

    /// `y` means yes; anything else, including just Enter, means no.
    pub fn yes(&mut self, prompt: &str) -> io::Result<bool> {
        Ok(self.ask(prompt)?.eq_ignore_ascii_case("y"))
    }

    /// Ask until the answer is a number in `range`.
    pub fn number(&mut self, prompt: &str, range: RangeInclusive<usize>) -> io::Result<usize> {
        loop {
            match self.ask(prompt)?.parse::<usize>() {
                Ok(n) if range.contains(&n) => return Ok(n),
                Ok(_) => self.say(format!(
                    "Invalid choice, please enter a number from {} to {}.",
                    range.start(),
                    range.end()
                ))?,
                Err(_) => self.say("Please enter a valid number.")?,
            }
        }
    }

    fn read_summary_choice(&mut self, candidates: &[String]) -> io::Result<SummaryChoice> {
        self.say("\nPlease choose a story summary:")?;
        for (i, candidate) in candidates.iter().enumerate() {
            self.say(format!("{}: {candidate}", i + 1))?;
        }
        self.say("0: generate new summaries")?;
        self.say("q: quit")?;

        loop {
            let answer = self.ask(&format!("\nYour choice (1-{}, 0 or q): ", candidates.len()))?;
            match parse_summary_choice(&answer) {
                Some(choice) => return Ok(choice),
                None => self.say("Please enter a valid number or q.")?,
            }
        }
    }
}

/// `q` quits, `0` regenerates, `n` selects candidate `n` (1-based).
pub fn parse_summary_choice(input: &str) -> Option<SummaryChoice> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Some(SummaryChoice::Quit);
    }
    match input.parse::<usize>().ok()? {
        0 => Some(SummaryChoice::Regenerate),
        n => Some(SummaryChoice::Select(n - 1)),
    }
}

impl<R: BufRead, W: Write> SummaryChooser for Console<R, W> {
    fn choose(&mut self, candidates: &[String]) -> SummaryChoice {
        match self.read_summary_choice(candidates) {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, "could not read summary choice");
                SummaryChoice::Quit
            }
        }
    }

    fn rejected(&mut self, choice: SummaryChoice) {
        if let SummaryChoice::Select(index) = choice {
            let _ = self.say(format!("There is no summary number {}.", index + 1));
        }
    }
}
