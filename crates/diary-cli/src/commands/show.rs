use chrono::{Local, Utc};
use diary_core::auth::Identity;
use diary_core::storage::ImageStorage;
use diary_core::{resolve_image_urls, Diary, DiaryClient, ImageLink};
use serde::Serialize;

use crate::commands::common::{format_diary_detail, resolve_diary};
use crate::error::CliError;

#[derive(Serialize)]
struct ShowJson<'a> {
    #[serde(flatten)]
    diary: &'a Diary,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_urls: Option<&'a [ImageLink]>,
}

/// Print one entry. With `storage`, each image is resolved to a download URL.
pub async fn run_show<I, S>(
    client: &DiaryClient<I>,
    id: &str,
    as_json: bool,
    storage: Option<&S>,
) -> Result<Vec<ImageLink>, CliError>
where
    I: Identity,
    S: ImageStorage,
{
    let diary = resolve_diary(client, id).await?;
    let links = match storage {
        Some(storage) => Some(resolve_image_urls(storage, &diary).await),
        None => None,
    };

    if as_json {
        let output = ShowJson {
            diary: &diary,
            image_urls: links.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let now_ms = Utc::now().timestamp_millis();
        for line in format_diary_detail(&diary, &Local, now_ms) {
            println!("{line}");
        }
        if let Some(links) = &links {
            println!("Image URLs:");
            for link in links {
                let url = link.url.as_deref().unwrap_or("(unavailable)");
                println!("  {} -> {}", link.remote_path, url);
            }
        }
    }
    Ok(links.unwrap_or_default())
}
