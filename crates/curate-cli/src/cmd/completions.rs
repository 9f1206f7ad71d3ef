//! `cur completions`: print a shell completion script.

use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the script for `shell` to `out`, named after the command's binary.
fn write_completions(
    shell: Shell,
    command: &mut clap::Command,
    out: &mut impl Write,
) -> Result<()> {
    let bin = command
        .get_bin_name()
        .unwrap_or_else(|| command.get_name())
        .to_string();
    generate(shell, command, bin, &mut *out);
    out.flush().context("failed to write completion script")
}

pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    write_completions(shell, command, &mut io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_completes_subcommands() {
        let mut command = clap::Command::new("cur")
            .subcommand(clap::Command::new("status"))
            .subcommand(clap::Command::new("rotate-left"));
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut command, &mut buf).unwrap();
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("_cur"));
        assert!(script.contains("rotate-left"));
    }
}
