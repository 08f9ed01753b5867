//! CLI command handlers.

use anyhow::Result;
use chrono::NaiveDate;
use civic_agenda::{
    ActivityStatus, ActivityUpdate, Config, LifecycleAction, NewActivity, OccurrenceQuery, Scope,
};

use super::{local, output};

/// Run the occurrences command.
pub async fn run_occurrences(
    config: Config,
    start: NaiveDate,
    end: Option<NaiveDate>,
    establishment: Option<String>,
    include_cancelled: bool,
    json_output: bool,
) -> Result<()> {
    let service = local::service(&config).await?;
    let end = match end {
        Some(end) => end,
        None => service.default_end(start)?,
    };
    let mut query = OccurrenceQuery::new(start, end);
    if let Some(establishment) = establishment {
        query = query.for_establishment(establishment);
    }
    if !include_cancelled {
        query = query.without_cancelled();
    }

    let occurrences = service.occurrences(&query).await?;
    output::print_occurrences(&occurrences, json_output);
    Ok(())
}

/// Run the create command.
pub async fn run_create(
    config: Config,
    file: String,
    planned: bool,
    json_output: bool,
) -> Result<()> {
    let mut request: NewActivity = local::read_json(&file)?;
    if planned {
        request.status = Some(ActivityStatus::Planned);
    }

    let service = local::service(&config).await?;
    let activity = service.create_activity(request).await?;
    output::print_activity("Created", &activity, json_output);
    Ok(())
}

/// Run the update command.
pub async fn run_update(
    config: Config,
    id: String,
    file: String,
    scope: Scope,
    json_output: bool,
) -> Result<()> {
    let update: ActivityUpdate = local::read_json(&file)?;
    let service = local::service(&config).await?;
    let activity = service.update_activity(&id, update, scope).await?;
    output::print_activity("Updated", &activity, json_output);
    Ok(())
}

/// Run the delete command.
pub async fn run_delete(config: Config, id: String, scope: Scope, json_output: bool) -> Result<()> {
    let service = local::service(&config).await?;
    let outcome = service.delete_activity(&id, scope).await?;
    output::print_delete_outcome(&outcome, json_output);
    Ok(())
}

/// Run the transition command.
pub async fn run_transition(
    config: Config,
    id: String,
    action: LifecycleAction,
    json_output: bool,
) -> Result<()> {
    let service = local::service(&config).await?;
    let outcome = service.transition(&id, action).await?;
    output::print_transition(&outcome, json_output);
    Ok(())
}

/// Run the submit-all command.
pub async fn run_submit_all(
    config: Config,
    establishment: Option<String>,
    json_output: bool,
) -> Result<()> {
    let service = local::service(&config).await?;
    let report = service.submit_all_drafts(establishment.as_deref()).await?;
    output::print_submit_report(&report, json_output);
    if !report.committed {
        anyhow::bail!("Bulk submit stopped after a failure; submitted drafts were rolled back");
    }
    Ok(())
}
