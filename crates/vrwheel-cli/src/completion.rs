//! Shell completion generation for vrwheelctl

use std::io;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::Cli;

pub fn generate_completion(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "vrwheelctl", &mut io::stdout());
}
