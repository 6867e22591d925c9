//! Interactive menu used when a value is neither configured nor given on the command line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::config::model::{parse_bool, Operation};
use crate::validation::paths::is_valid_directory;

/// Line-based prompts over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompts on the terminal.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks until the user picks an operation.
    pub fn operation(&mut self) -> io::Result<Operation> {
        loop {
            let answer = self.ask(
                "What do you want to do?\n  1. Rewrite metadata (track names, title, attachments)\n  2. Attach subtitles\n\nEnter 1 or 2: ",
            )?;

            match answer.trim() {
                "1" => return Ok(Operation::Rewrite),
                "2" => return Ok(Operation::Attach),
                _ => writeln!(self.output, "\nInvalid option. Please enter 1 or 2.\n")?,
            }
        }
    }

    /// Asks for the replacement text; a blank answer deletes keywords.
    pub fn replacement(&mut self) -> io::Result<String> {
        self.ask("Replacement for matched keywords (leave blank to delete them): ")
    }

    /// Asks until an existing directory is entered.
    pub fn directory(&mut self) -> io::Result<PathBuf> {
        loop {
            let answer = self.ask("Full path of the folder with the episodes: ")?;
            let path = PathBuf::from(answer.trim());

            if !answer.trim().is_empty() && is_valid_directory(&path) {
                return Ok(path);
            }
            writeln!(self.output, "Invalid path. Please enter an existing folder.")?;
        }
    }

    /// Asks whether subtitles are deleted after muxing; blank means yes.
    pub fn delete_subs(&mut self) -> io::Result<bool> {
        loop {
            let answer = self.ask("Delete subtitle files after they are attached? [Y/n]: ")?;
            if answer.trim().is_empty() {
                return Ok(true);
            }

            match parse_bool("DELETE_SUBS", &answer) {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "Please answer yes or no.")?,
            }
        }
    }

    /// Prints `question` and reads one line without its line ending.
    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while prompting",
            ));
        }

        let trimmed_len = line.trim_end_matches(|c: char| c == '\n' || c == '\r').len();
        line.truncate(trimmed_len);
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn operation_retries_until_valid() {
        let mut p = prompter("3\nabc\n2\n");
        assert_eq!(p.operation().unwrap(), Operation::Attach);

        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("Invalid option").count(), 2);
    }

    #[test]
    fn replacement_keeps_inner_spacing() {
        let mut p = prompter(" Fan Sub \r\n");
        assert_eq!(p.replacement().unwrap(), " Fan Sub ");

        let mut p = prompter("\n");
        assert_eq!(p.replacement().unwrap(), "");
    }

    #[test]
    fn directory_must_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = format!("/definitely/not/here\n\n{}\n", dir.path().display());
        let mut p = prompter(&input);

        assert_eq!(p.directory().unwrap(), dir.path());
    }

    #[test]
    fn delete_subs_defaults_to_yes() {
        assert!(prompter("\n").delete_subs().unwrap());
        assert!(!prompter("maybe\nn\n").delete_subs().unwrap());
    }

    #[test]
    fn closed_input_is_an_error() {
        let err = prompter("").operation().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
