use std::fmt;

use chrono::DateTime;

use crate::types::Image;

/// Hash Last.fm uses for its grey star placeholder image.
pub const PLACEHOLDER_IMAGE_HASH: &str = "2a96cbd8b46e442fc41c2b86b821562f";

const IMAGE_SIZE_PREFERENCE: [&str; 4] = ["extralarge", "large", "medium", "small"];

/// Time range for top artists/albums/tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Overall,
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Overall => "overall",
            Period::Week => "7day",
            Period::Month => "1month",
            Period::Quarter => "3month",
            Period::HalfYear => "6month",
            Period::Year => "12month",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a period from the Last.fm name or a friendly alias.
pub fn parse_period(s: &str) -> Result<Period, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "overall" | "all" | "alltime" => Ok(Period::Overall),
        "7day" | "week" | "weekly" => Ok(Period::Week),
        "1month" | "month" | "monthly" => Ok(Period::Month),
        "3month" | "quarter" => Ok(Period::Quarter),
        "6month" | "half" => Ok(Period::HalfYear),
        "12month" | "year" | "yearly" => Ok(Period::Year),
        "" => Err("period cannot be empty".to_string()),
        other => Err(format!(
            "invalid period '{other}'. Valid: overall, 7day, 1month, 3month, 6month, 12month"
        )),
    }
}

/// Last.fm usernames are case-insensitive.
pub fn same_username(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn is_placeholder(url: &str) -> bool {
    url.is_empty() || url.contains(PLACEHOLDER_IMAGE_HASH)
}

/// Picks the best image: an animated GIF if present, otherwise the largest
/// non-placeholder size, otherwise the last image listed.
pub fn pick_image_url(images: &[Image]) -> Option<String> {
    if let Some(gif) = images
        .iter()
        .find(|img| !img.url.is_empty() && img.url.to_lowercase().contains(".gif"))
    {
        return Some(gif.url.clone());
    }

    let by_size = IMAGE_SIZE_PREFERENCE.iter().find_map(|size| {
        images
            .iter()
            .find(|img| img.size == *size && !is_placeholder(&img.url))
    });

    let url = by_size
        .or_else(|| images.last().filter(|img| !img.url.is_empty()))
        .map(|img| img.url.clone())?;

    if is_placeholder(&url) { None } else { Some(url) }
}

/// Shortens a token for log output.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…")
}

/// Formats a Last.fm unix timestamp string as `YYYY-MM-DD HH:MM`.
pub fn format_uts(uts: &str) -> String {
    uts.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
