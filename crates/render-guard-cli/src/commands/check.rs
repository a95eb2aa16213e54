//! Check command - evaluate one operation against the configured policy

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use render_guard::security::{
    Credential, Operation, RenderScope, RenderSecurityPolicy, SecurityHost,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OperationKind {
    Read,
    Write,
    Delete,
    Exec,
    Connect,
    Exit,
    Link,
    PropertyWrite,
}

pub struct CheckArgs {
    pub kind: OperationKind,
    pub target: String,
    pub config: Option<PathBuf>,
    pub restrict_reads: bool,
    pub json: bool,
}

/// Build the operation a `kind`/`target` pair names
pub fn operation(kind: OperationKind, target: &str) -> Result<Operation> {
    Ok(match kind {
        OperationKind::Read => Operation::read(target),
        OperationKind::Write => Operation::write(target),
        OperationKind::Delete => Operation::delete(target),
        OperationKind::Exec => Operation::Exec {
            command: target.to_string(),
        },
        OperationKind::Connect => match target.rsplit_once(':') {
            Some((host, port)) => Operation::Connect {
                host: host.to_string(),
                port: Some(
                    port.parse()
                        .with_context(|| format!("Invalid port in '{}'", target))?,
                ),
            },
            None => Operation::Connect {
                host: target.to_string(),
                port: None,
            },
        },
        OperationKind::Exit => Operation::Exit {
            status: target
                .parse()
                .with_context(|| format!("Invalid exit status '{}'", target))?,
        },
        OperationKind::Link => Operation::Link {
            library: target.to_string(),
        },
        OperationKind::PropertyWrite => {
            if target.is_empty() {
                bail!("Property name must not be empty");
            }
            Operation::PropertyWrite {
                key: target.to_string(),
            }
        }
    })
}

/// Evaluate the operation and print the verdict. Returns whether it was allowed.
pub fn run(args: CheckArgs) -> Result<bool> {
    let mut config = super::load_config(args.config.as_deref())?;
    if args.restrict_reads {
        config.project.sandbox_mut().restrict_reads = Some(true);
    }
    let operation = operation(args.kind, &args.target)?;

    let policy = Arc::new(
        RenderSecurityPolicy::from_config(&config).on_host(Arc::new(SecurityHost::new())),
    );
    let credential = Credential::new();
    policy
        .activate(&credential)
        .context("Failed to activate render security policy")?;
    let verdict = RenderScope::run(|| policy.check(&operation));
    policy
        .dispose(&credential)
        .context("Failed to dispose render security policy")?;

    tracing::debug!(operation = %operation, allowed = verdict.is_ok(), "evaluated");

    if args.json {
        let output = serde_json::json!({
            "operation": operation.to_string(),
            "allowed": verdict.is_ok(),
            "resource": verdict.as_ref().err().map(|v| v.resource().label()),
            "message": verdict.as_ref().err().map(|v| v.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match &verdict {
            Ok(()) => println!("allowed"),
            Err(violation) => println!("{}", violation),
        }
    }

    Ok(verdict.is_ok())
}
