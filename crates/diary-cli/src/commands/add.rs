use std::path::PathBuf;

use diary_core::auth::Identity;
use diary_core::{Diary, DiaryClient, Mood, PendingImageUpload};

use crate::commands::common::{discard_queued, into_cli_result, parse_date};
use crate::error::CliError;

pub struct AddArgs {
    pub title: String,
    pub description: String,
    pub mood: Mood,
    pub date: Option<String>,
    pub images: Vec<PathBuf>,
}

/// Insert a new entry, queueing its images, and return the stored copy.
///
/// Nothing stays queued when the entry is not stored.
pub async fn run_add<I: Identity>(client: &DiaryClient<I>, args: AddArgs) -> Result<Diary, CliError> {
    let mut draft = Diary::new(args.title, args.description, args.mood);
    if let Some(raw) = args.date.as_deref() {
        draft = draft.with_date(parse_date(raw)?);
    }

    let mut queued = Vec::with_capacity(args.images.len());
    let stored = match attach_all(client, &mut draft, &args.images, &mut queued).await {
        Ok(()) => into_cli_result(client.insert_diary(&draft).await),
        Err(error) => Err(error),
    };
    let stored = match stored {
        Ok(stored) => stored,
        Err(error) => {
            discard_queued(client, &queued).await;
            return Err(error);
        }
    };

    println!("{}", stored.id);
    Ok(stored)
}

async fn attach_all<I: Identity>(
    client: &DiaryClient<I>,
    draft: &mut Diary,
    images: &[PathBuf],
    queued: &mut Vec<PendingImageUpload>,
) -> Result<(), CliError> {
    for image in images {
        queued.push(client.attach_image(draft, image).await?);
    }
    Ok(())
}
