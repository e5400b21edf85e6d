use chrono::Local;
use diary_core::auth::Identity;
use diary_core::{DiaryClient, RequestState};
use futures::StreamExt;

use crate::commands::common::format_group_lines;
use crate::error::CliError;

/// Print the grouped listing on start and after every change until Ctrl-C.
pub async fn run_watch<I: Identity>(client: &DiaryClient<I>) -> Result<(), CliError> {
    let mut listing = Box::pin(client.observe_diaries());

    loop {
        let state = tokio::select! {
            state = listing.next() => state,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };

        match state {
            Some(RequestState::Success(groups)) => {
                println!("--- {} entries ---", groups.diary_count());
                for line in format_group_lines(&groups, &Local) {
                    println!("{line}");
                }
            }
            Some(RequestState::Error(diary_core::Error::Unauthenticated)) => {
                return Err(diary_core::Error::Unauthenticated.into());
            }
            Some(RequestState::Error(error)) => eprintln!("Error: {error}"),
            Some(RequestState::Idle | RequestState::Loading) => {}
            None => return Ok(()),
        }
    }
}
