//! `turnover run-now`: build the schedule and deliver it once.

use turnover_server::{DispatchOutcome, Dispatcher};

use crate::config::{ClientConfig, check_window_days};
use crate::error::{ClientError, ClientResult};

/// Delivers the schedule to every configured output and prints the outcome.
pub async fn run(config: &ClientConfig, days: Option<i64>) -> ClientResult<()> {
    let days = days.unwrap_or(config.default_days);
    check_window_days(days).map_err(ClientError::Config)?;

    let engine = super::build_engine(config)?;
    let dispatcher = super::build_dispatcher(config, engine)?;
    let outcome = dispatch(&dispatcher, days).await?;
    println!("{}", outcome.summary());
    check_outcome(&outcome)
}

/// Runs the dispatcher once.
pub async fn dispatch(dispatcher: &Dispatcher, days: i64) -> ClientResult<DispatchOutcome> {
    Ok(dispatcher.run_now(days).await?)
}

/// Turns failed outputs into an error.
pub fn check_outcome(outcome: &DispatchOutcome) -> ClientResult<()> {
    if outcome.is_success() {
        Ok(())
    } else {
        Err(ClientError::Dispatch(format!(
            "{} of {} outputs failed",
            outcome.failures,
            outcome.results.len()
        )))
    }
}
