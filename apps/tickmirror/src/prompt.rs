use std::io::{self, BufRead, Write};
use tickmirror_application::session::RequestTokenPrompt;

/// Prints the login URL and reads the request token from one input line.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

pub fn stdin_prompt() -> LinePrompt<io::StdinLock<'static>, io::Stdout> {
    LinePrompt::new(io::stdin().lock(), io::stdout())
}

impl<R: BufRead, W: Write> RequestTokenPrompt for LinePrompt<R, W> {
    fn request_token(&mut self, login_url: &str) -> Result<String, String> {
        writeln!(self.output, "Login URL: {login_url}")
            .and_then(|_| write!(self.output, "Enter the request token: "))
            .and_then(|_| self.output.flush())
            .map_err(|err| format!("failed to write login prompt: {err}"))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|err| format!("failed to read request token: {err}"))?;
        if read == 0 {
            return Err("stdin closed before a request token was entered".to_string());
        }
        Ok(line.trim().to_string())
    }
}
