//! `lookup`: the single-record algorithm for one address

use anyhow::{Result, bail};
use chrono::NaiveDate;

use super::intercom_client;
use crate::cli::{LookupArgs, output};
use crate::config::Config;
use crate::records::RawRow;
use crate::records::columns;
use crate::session::Session;

pub async fn handle_lookup_command(args: LookupArgs, today: NaiveDate) -> Result<()> {
    let email = args.email.trim();
    if email.is_empty() {
        bail!("Email address is empty");
    }

    let config = Config::load()?;
    let lookup = intercom_client(&config, config.resilience().retry)?;

    let mut session = Session::new(lookup, today);
    session.load(&[RawRow::new().with(columns::EMAIL, email)]);

    let outcome = session.refetch_one(0).await;
    output::print_outcome(email, &outcome);

    Ok(())
}
