// Terminal prompts: the interactive side of a run (SSO token, collection
// choice). On a terminal they use `dialoguer`; when stdin is piped the answers
// are read line by line instead. Tests use `MockPrompter` or `LinePrompter`.

use dialoguer::{Input, Password};
use std::io::{self, BufRead, IsTerminal};
use std::sync::Mutex;
use sword_deposit_core::contract::Prompter;
use sword_deposit_core::SwordError;

const SSO_PROMPT: &str =
    "If you want to authenticate with an OpenAM SSO ID, you can enter it now. Otherwise, just press enter";
const COLLECTION_PROMPT: &str = "Please enter the number of the collection to use for the deposit";

/// Prompter reading answers from the controlling terminal, or from stdin
/// lines when no terminal is attached.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn sso_token(&self) -> Result<Option<String>, SwordError> {
        if !io::stdin().is_terminal() {
            return LinePrompter::new(io::stdin().lock()).sso_token();
        }
        // `Password` keeps the token off the screen; an empty answer skips it.
        let token = Password::new()
            .with_prompt(SSO_PROMPT)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| SwordError::Prompt(e.to_string()))?;
        let token = token.trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }

    fn collection_index(&self, listing: &str) -> Result<usize, SwordError> {
        if !io::stdin().is_terminal() {
            return LinePrompter::new(io::stdin().lock()).collection_index(listing);
        }
        eprintln!("{listing}");
        Input::<usize>::new()
            .with_prompt(COLLECTION_PROMPT)
            .interact_text()
            .map_err(|e| SwordError::Prompt(e.to_string()))
    }
}

/// Prompter answering from any line-oriented reader. Prompts go to stderr.
pub struct LinePrompter<R> {
    reader: Mutex<R>,
}

impl<R: BufRead> LinePrompter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }

    /// Next line without its line ending; `None` at end of input.
    fn read_line(&self) -> Result<Option<String>, SwordError> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| SwordError::Prompt("input reader is poisoned".to_string()))?;
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| SwordError::Prompt(e.to_string()))?;
        Ok((read > 0).then(|| line.trim().to_string()))
    }
}

impl<R: BufRead> Prompter for LinePrompter<R> {
    fn sso_token(&self) -> Result<Option<String>, SwordError> {
        eprintln!("{SSO_PROMPT}:");
        Ok(self.read_line()?.filter(|token| !token.is_empty()))
    }

    fn collection_index(&self, listing: &str) -> Result<usize, SwordError> {
        eprintln!("{listing}");
        eprintln!("{COLLECTION_PROMPT}:");
        let answer = self
            .read_line()?
            .ok_or_else(|| SwordError::Prompt("no collection number given".to_string()))?;
        answer
            .parse::<usize>()
            .map_err(|_| SwordError::Prompt(format!("`{answer}` is not a collection number")))
    }
}
