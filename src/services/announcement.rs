use crate::state::song::PlayedSongRecord;

/// Default template for the end-of-song stats message.
pub const DEFAULT_SONG_STATS_TEMPLATE: &str =
    "{username} played {trackName} by {artistName}: 👍 {likes} 👎 {dislikes} ⭐ {stars}";

/// Fill the song-stats `template` with the values of an archived record.
///
/// Supported placeholders: `{username}`, `{trackName}`, `{artistName}`, `{likes}`,
/// `{dislikes}` and `{stars}`. Unknown placeholders are left as they are. The
/// template is scanned once, so substituted values are never expanded again.
pub fn render_song_stats(template: &str, record: &PlayedSongRecord, username: &str) -> String {
    let tally = record.vote_counts;
    let value_of = |name: &str| match name {
        "username" => Some(username.to_string()),
        "trackName" => Some(record.track_name.clone()),
        "artistName" => Some(record.artist_name.clone()),
        "likes" => Some(tally.likes.to_string()),
        "dislikes" => Some(tally.dislikes.to_string()),
        "stars" => Some(tally.stars.to_string()),
        _ => None,
    };

    let mut message = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        message.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after
            .find('}')
            .and_then(|close| value_of(&after[..close]).map(|value| (value, close)));
        match substituted {
            Some((value, close)) => {
                message.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                message.push('{');
                rest = after;
            }
        }
    }
    message.push_str(rest);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::song::{SongIdentity, VoteTally};

    fn record() -> PlayedSongRecord {
        PlayedSongRecord::archive(
            SongIdentity {
                song_id: None,
                dj_uuid: Some("dj".into()),
                artist_name: "Daft Punk".into(),
                track_name: "Veridis Quo".into(),
            },
            VoteTally {
                likes: 10,
                dislikes: 2,
                stars: 5,
            },
        )
    }

    #[test]
    fn renders_default_template() {
        assert_eq!(
            render_song_stats(DEFAULT_SONG_STATS_TEMPLATE, &record(), "Ada"),
            "Ada played Veridis Quo by Daft Punk: 👍 10 👎 2 ⭐ 5"
        );
    }

    #[test]
    fn repeated_and_unknown_placeholders() {
        assert_eq!(
            render_song_stats("{stars}/{stars} {room}", &record(), "Ada"),
            "5/5 {room}"
        );
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let mut record = record();
        record.track_name = "{likes} Ways".into();
        record.vote_counts.likes = 7;
        assert_eq!(
            render_song_stats("{trackName} got {likes}", &record, "{username}"),
            "{likes} Ways got 7"
        );
    }

    #[test]
    fn stray_braces_are_kept() {
        assert_eq!(
            render_song_stats("{{stars}} {likes", &record(), "Ada"),
            "{5} {likes"
        );
    }
}
