//! Music links
//!
//! A static catalogue of streaming services and featured playlists. Nothing is
//! played locally; every entry resolves to a URL.

use serde::Serialize;

use super::matches_query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MusicService {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub song_count: u32,
    pub service: &'static str,
    pub url: &'static str,
}

pub const SERVICES: &[MusicService] = &[
    MusicService {
        id: "spotify",
        name: "Spotify",
        description: "Stream millions of songs, podcasts, and playlists",
        url: "https://open.spotify.com",
    },
    MusicService {
        id: "youtube",
        name: "YouTube Music",
        description: "Official music streaming from YouTube",
        url: "https://music.youtube.com",
    },
    MusicService {
        id: "apple",
        name: "Apple Music",
        description: "Stream over 90 million songs ad-free",
        url: "https://music.apple.com",
    },
    MusicService {
        id: "amazon",
        name: "Amazon Music",
        description: "Stream millions of songs with Prime",
        url: "https://music.amazon.com",
    },
];

pub const PLAYLISTS: &[Playlist] = &[
    Playlist {
        id: "1",
        name: "Today's Top Hits",
        description: "The hottest tracks right now",
        song_count: 50,
        service: "spotify",
        url: "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M",
    },
    Playlist {
        id: "2",
        name: "Chill Vibes",
        description: "Relaxing music for any mood",
        song_count: 35,
        service: "spotify",
        url: "https://open.spotify.com/playlist/37i9dQZF1DX3WvGXE8FqYX",
    },
    Playlist {
        id: "3",
        name: "Workout Mix",
        description: "High energy tracks to keep you moving",
        song_count: 40,
        service: "spotify",
        url: "https://open.spotify.com/playlist/37i9dQZF1DX76Wlfdnj7AP",
    },
    Playlist {
        id: "4",
        name: "Classic Rock",
        description: "Timeless rock anthems",
        song_count: 60,
        service: "spotify",
        url: "https://open.spotify.com/playlist/37i9dQZF1DX5Vy6DFOcx00",
    },
    Playlist {
        id: "5",
        name: "Jazz Lounge",
        description: "Smooth jazz for sophisticated listening",
        song_count: 45,
        service: "spotify",
        url: "https://open.spotify.com/playlist/37i9dQZF1DXbITWG1ZJKYt",
    },
    Playlist {
        id: "6",
        name: "Electronic Beats",
        description: "Electronic and dance music",
        song_count: 55,
        service: "spotify",
        url: "https://open.spotify.com/playlist/37i9dQZF1DX8NTLI2TtZa6",
    },
];

#[must_use]
pub fn service(id: &str) -> Option<&'static MusicService> {
    SERVICES.iter().find(|s| s.id == id)
}

/// Playlists whose name or description contains `query`
#[must_use]
pub fn search_playlists(query: &str) -> Vec<&'static Playlist> {
    PLAYLISTS
        .iter()
        .filter(|p| matches_query(query, [p.name, p.description]))
        .collect()
}

/// Spotify search link for free text; `None` for blank input
#[must_use]
pub fn search_url(query: &str) -> Option<String> {
    let query = query.trim();
    (!query.is_empty())
        .then(|| format!("https://open.spotify.com/search/{}", urlencoding::encode(query)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_name_and_description() {
        let found = search_playlists("jazz");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Jazz Lounge");
        assert_eq!(search_playlists("dance")[0].name, "Electronic Beats");
        assert_eq!(search_playlists("").len(), PLAYLISTS.len());
    }

    #[test]
    fn search_url_encodes() {
        assert_eq!(
            search_url(" Hotel California ").as_deref(),
            Some("https://open.spotify.com/search/Hotel%20California")
        );
        assert_eq!(search_url("  "), None);
    }

    #[test]
    fn services_by_id() {
        assert_eq!(service("apple").map(|s| s.name), Some("Apple Music"));
        assert!(service("tidal").is_none());
    }
}
