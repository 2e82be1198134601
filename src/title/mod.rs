mod clean;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use clean::clean_title;

/// Best guess of the song behind a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSong {
    pub song_title: String,
    pub artist: String,
}

impl ParsedSong {
    /// Query sent to the track search
    pub fn search_query(&self) -> String {
        format!("{} {}", self.song_title, self.artist)
            .trim()
            .to_string()
    }
}

/// Separator patterns in priority order, a title may satisfy several of them
static BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+by\s+(.+)$").expect("valid regex"));
static FT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+ft\.?\s+(.+)$").expect("valid regex"));
static FEAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+feat\.?\s+(.+)$").expect("valid regex"));
static DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+[-–—]\s+(.+)$").expect("valid regex"));

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Channel and segment name the same act when either contains the other
fn same_act(channel: &str, segment: &str) -> bool {
    !channel.is_empty()
        && !segment.is_empty()
        && (contains_ignore_case(segment, channel) || contains_ignore_case(channel, segment))
}

/// Split a cleaned title into `(song_title, artist)`
fn split_artist(title: &str, channel: &str) -> Option<(String, String)> {
    for re in [&*BY, &*FT, &*FEAT] {
        if let Some(caps) = re.captures(title) {
            return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
        }
    }

    let caps = DASH.captures(title)?;
    let left = caps[1].trim();
    let right = caps[2].trim();
    if same_act(channel, left) {
        Some((right.to_string(), left.to_string()))
    } else if same_act(channel, right) {
        Some((left.to_string(), right.to_string()))
    } else {
        Some((right.to_string(), left.to_string()))
    }
}

/// Turn a raw video title and channel name into a song title and artist
///
/// Never fails: without a recognizable pattern the cleaned title is the song and
/// the channel is the artist. Neither field is empty as long as the channel is
/// not; a blank title takes the channel name as song title.
pub fn extract_song_info(raw_title: &str, channel_name: &str) -> ParsedSong {
    let channel = channel_name.trim();
    let cleaned = clean_title(raw_title);
    let cleaned = if cleaned.is_empty() {
        raw_title.trim().to_string()
    } else {
        cleaned
    };

    let (song_title, artist) =
        split_artist(&cleaned, channel).unwrap_or_else(|| (cleaned.clone(), channel.to_string()));

    let artist = if artist.trim().is_empty() {
        channel.to_string()
    } else {
        artist
    };
    let song_title = if song_title.trim().is_empty() {
        cleaned
    } else {
        song_title
    };
    let song_title = if song_title.is_empty() {
        channel.to_string()
    } else {
        song_title
    };

    ParsedSong { song_title, artist }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(song_title: &str, artist: &str) -> ParsedSong {
        ParsedSong {
            song_title: song_title.to_string(),
            artist: artist.to_string(),
        }
    }

    #[test]
    fn dash_with_channel_on_the_left() {
        assert_eq!(
            extract_song_info(
                "Rick Astley - Never Gonna Give You Up (Official Music Video)",
                "Rick Astley"
            ),
            parsed("Never Gonna Give You Up", "Rick Astley")
        );
    }

    #[test]
    fn by_wins_over_channel() {
        assert_eq!(
            extract_song_info("Lose Yourself by Eminem [Lyrics]", "EminemMusic"),
            parsed("Lose Yourself", "Eminem")
        );
    }

    #[test]
    fn by_is_checked_before_dash() {
        assert_eq!(
            extract_song_info("Artist - Song by Someone", "Artist"),
            parsed("Artist - Song", "Someone")
        );
    }

    #[test]
    fn ft_and_feat() {
        assert_eq!(
            extract_song_info("Love Me ft. Drake", "Lil Wayne"),
            parsed("Love Me", "Drake")
        );
        assert_eq!(
            extract_song_info("Stay feat Justin Bieber (Official Video)", "The Kid LAROI"),
            parsed("Stay", "Justin Bieber")
        );
    }

    #[test]
    fn dash_with_channel_on_the_right() {
        assert_eq!(
            extract_song_info("Bohemian Rhapsody - Queen", "Queen Official"),
            parsed("Bohemian Rhapsody", "Queen")
        );
    }

    #[test]
    fn dash_defaults_to_artist_first() {
        assert_eq!(
            extract_song_info("Daft Punk - Get Lucky", "Some Uploader"),
            parsed("Get Lucky", "Daft Punk")
        );
    }

    #[test]
    fn no_pattern_uses_channel() {
        assert_eq!(
            extract_song_info("Bad Guy (Official Video)", "Billie Eilish"),
            parsed("Bad Guy", "Billie Eilish")
        );
    }

    #[test]
    fn empty_channel_does_not_match_everything() {
        assert_eq!(
            extract_song_info("Song - Artist", ""),
            parsed("Artist", "Song")
        );
    }

    #[test]
    fn title_made_only_of_annotations_is_kept() {
        assert_eq!(
            extract_song_info("(Official Video)", "Channel"),
            parsed("(Official Video)", "Channel")
        );
    }

    #[test]
    fn artist_never_empty_with_channel() {
        let titles = [
            "",
            "   ",
            " - ",
            "by",
            "Song by ",
            "ft. x",
            "Song - Lyrics",
            "A - B - C",
        ];
        for title in titles {
            let song = extract_song_info(title, "Channel");
            assert!(!song.artist.trim().is_empty(), "title: {:?}", title);
            assert!(!song.song_title.trim().is_empty(), "title: {:?}", title);
        }
    }

    #[test]
    fn blank_title_falls_back_to_channel() {
        assert_eq!(extract_song_info("", "Channel"), parsed("Channel", "Channel"));
        assert_eq!(
            extract_song_info("(Official Video)", "Channel").artist,
            "Channel"
        );
    }

    #[test]
    fn search_query_joins_fields() {
        assert_eq!(parsed("Song", "Artist").search_query(), "Song Artist");
        assert_eq!(parsed("Song", "").search_query(), "Song");
    }
}
