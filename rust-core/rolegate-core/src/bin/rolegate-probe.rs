// SPDX-License-Identifier: PMPL-1.0-or-later
//! RoleGate probe
//!
//! Runs one access check against role lists taken from the environment and
//! prints the decision as JSON. Exits 1 when access is denied.
//!
//! ```text
//! ROLEGATE_ADMIN_IDS=100 ROLEGATE_VIEWER_IDS=300 rolegate-probe 300 admin,coordinator
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use rolegate_core::{init_tracing, InMemoryRoleStore, Role, RoleAuthority, RoleGateConfig, RoleSnapshot, CHECK_ACTION};

const ENV_ADMIN_IDS: &str = "ROLEGATE_ADMIN_IDS";
const ENV_COORDINATOR_IDS: &str = "ROLEGATE_COORDINATOR_IDS";
const ENV_VIEWER_IDS: &str = "ROLEGATE_VIEWER_IDS";

/// Check whether a user may run a command.
#[derive(Parser, Debug)]
#[command(name = "rolegate-probe", version, about = "One-shot RoleGate access check")]
struct Cli {
    /// User id, exactly as the transport delivered it.
    user_id: String,

    /// Required roles, comma-separated. Any one of them is sufficient.
    #[arg(value_delimiter = ',', required = true)]
    roles: Vec<String>,

    /// Action name recorded in the audit event.
    #[arg(long, default_value = CHECK_ACTION)]
    action: String,
}

/// Parse a comma-separated id list. Unset or empty means no members.
fn id_list(key: &str) -> Result<Vec<i64>> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("{key}: {s:?} is not a user id"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = RoleGateConfig::from_env().context("loading configuration")?;
    if let Err(err) = init_tracing(config.log_format) {
        bail!("failed to initialize tracing: {err}");
    }

    let required = cli
        .roles
        .iter()
        .map(|r| r.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()
        .context("parsing required roles")?;

    let snapshot = RoleSnapshot::new(
        id_list(ENV_ADMIN_IDS)?,
        id_list(ENV_COORDINATOR_IDS)?,
        id_list(ENV_VIEWER_IDS)?,
    );
    let store = Arc::new(InMemoryRoleStore::new(snapshot));
    let authority = RoleAuthority::new(config, store)?;

    let decision = authority
        .check_action(cli.user_id.as_str(), &required, &cli.action)
        .await?;

    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(if decision.granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
