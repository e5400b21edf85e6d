use chrono::Local;
use diary_core::auth::Identity;
use diary_core::DiaryClient;

use crate::commands::common::{current_groups, format_group_lines, group_items};
use crate::error::CliError;

pub async fn run_list<I: Identity>(client: &DiaryClient<I>, as_json: bool) -> Result<(), CliError> {
    let groups = current_groups(client, Local).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&group_items(&groups))?);
    } else if groups.is_empty() {
        println!("No diary entries yet.");
    } else {
        for line in format_group_lines(&groups, &Local) {
            println!("{line}");
        }
    }

    Ok(())
}
