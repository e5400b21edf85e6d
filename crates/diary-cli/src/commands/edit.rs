use diary_core::auth::Identity;
use diary_core::{Diary, DiaryClient, Mood};

use crate::commands::common::{into_cli_result, parse_date, resolve_diary};
use crate::error::CliError;

#[derive(Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mood: Option<Mood>,
    pub date: Option<String>,
}

/// Rewrite an entry with the given fields changed; the rest keep their values.
pub async fn run_edit<I: Identity>(
    client: &DiaryClient<I>,
    id: &str,
    args: EditArgs,
) -> Result<Diary, CliError> {
    let existing = resolve_diary(client, id).await?;

    let edited = Diary {
        title: args.title.unwrap_or_else(|| existing.title.clone()),
        description: args
            .description
            .unwrap_or_else(|| existing.description.clone()),
        mood: args.mood.unwrap_or(existing.mood),
        date: match args.date.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => existing.date,
        },
        ..existing.clone()
    };

    if edited == existing {
        println!("{}", existing.id);
        return Ok(existing);
    }

    let updated = into_cli_result(client.update_diary(&edited).await)?;
    println!("{}", updated.id);
    Ok(updated)
}
