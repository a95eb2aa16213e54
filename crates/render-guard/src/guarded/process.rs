//! Process control

use crate::security::{Operation, SecurityHost};
use std::convert::Infallible;
use std::io;
use std::process::{Child, Command, Output};

fn check_command(host: &SecurityHost, command: &Command) -> io::Result<()> {
    host.check(&Operation::Exec {
        command: command.get_program().to_string_lossy().into_owned(),
    })?;
    Ok(())
}

pub fn spawn(host: &SecurityHost, command: &mut Command) -> io::Result<Child> {
    check_command(host, command)?;
    command.spawn()
}

/// Run `command` to completion and collect its output
pub fn output(host: &SecurityHost, command: &mut Command) -> io::Result<Output> {
    check_command(host, command)?;
    command.output()
}

/// Terminate the process with `status`. Only returns when refused.
pub fn exit(host: &SecurityHost, status: i32) -> io::Result<Infallible> {
    host.check(&Operation::Exit { status })?;
    std::process::exit(status)
}
