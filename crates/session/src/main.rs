//! `crm-access` — inspect the access core from a terminal.
//!
//! ```text
//! crm-access [URL]          start a session (optionally from a deep link) and print its tenant state
//! crm-access roles          print the role catalog
//! crm-access explain ROLE PERMISSION
//! ```

use anyhow::Context;

use crm_auth::{Permission, Role, RoleAuthority, explain_authorization};
use crm_session::{Session, SessionConfig};

fn main() -> anyhow::Result<()> {
    let config = SessionConfig::from_env();
    crm_observability::init_with_filter(&config.log_filter);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = match args.first().map(String::as_str) {
        Some("roles") => serde_json::to_string_pretty(&RoleAuthority::shared().catalog())?,
        Some("explain") => {
            let role = args
                .get(1)
                .and_then(|r| Role::normalized(r))
                .context("usage: crm-access explain ROLE PERMISSION")?;
            let permission = args
                .get(2)
                .map(|p| Permission::new(p.clone()))
                .context("usage: crm-access explain ROLE PERMISSION")?;
            let explanation =
                explain_authorization(&RoleAuthority::shared(), Some(&role), &permission);
            serde_json::to_string_pretty(&explanation)?
        }
        url => {
            let session = Session::start_from_config(config, url)?;
            serde_json::to_string_pretty(&session.end())?
        }
    };

    println!("{output}");
    Ok(())
}
