//! Echo of captured child output.

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

pub const ERROR_PREFIX: &str = "ERROR:";

pub struct OutputEcho {
    pub color: bool,
}

impl Default for OutputEcho {
    fn default() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }
}

impl OutputEcho {
    /// Stdout verbatim; stderr, when non-empty, behind an `ERROR:` prefix.
    pub fn echo(&self, stdout: &str, stderr: &str) -> io::Result<()> {
        self.write_to(&mut io::stdout().lock(), &mut io::stderr().lock(), stdout, stderr)
    }

    pub fn write_to<O: Write, E: Write>(
        &self,
        out: &mut O,
        err: &mut E,
        stdout: &str,
        stderr: &str,
    ) -> io::Result<()> {
        out.write_all(stdout.as_bytes())?;
        out.flush()?;
        if !stderr.is_empty() {
            if self.color {
                write!(err, "{} ", ERROR_PREFIX.red().bold())?;
            } else {
                write!(err, "{} ", ERROR_PREFIX)?;
            }
            err.write_all(stderr.as_bytes())?;
            if !stderr.ends_with('\n') {
                writeln!(err)?;
            }
            err.flush()?;
        }
        Ok(())
    }
}
