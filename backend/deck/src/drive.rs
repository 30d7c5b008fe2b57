//! Google Drive share links cannot be used as `<img>` sources. They get rewritten to the
//! `lh3.googleusercontent.com` direct link, anything else passes through unchanged.
use std::sync::LazyLock;

use regex::Regex;

use crate::models::PromptCard;

const DIRECT_HOST: &str = "lh3.googleusercontent.com";
const DRIVE_HOST: &str = "drive.google.com";

static FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("file pattern is valid"));
static ID_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=([a-zA-Z0-9_-]+)").expect("id pattern is valid"));

pub fn direct_image_url(url: &str) -> String {
    if url.contains(DIRECT_HOST) || !url.contains(DRIVE_HOST) {
        return url.to_string();
    }

    let file_id = FILE_PATH
        .captures(url)
        .or_else(|| ID_PARAM.captures(url))
        .and_then(|captures| captures.get(1));

    match file_id {
        Some(id) => format!("https://{DIRECT_HOST}/d/{}", id.as_str()),
        None => url.to_string(),
    }
}

pub fn rewrite_images(cards: &mut [PromptCard]) {
    for card in cards {
        let items = card
            .before_items
            .iter_mut()
            .chain(card.after_items.iter_mut());

        for item in items {
            if let Some(image) = item.image.as_mut() {
                *image = direct_image_url(image);
            }
        }
    }
}
