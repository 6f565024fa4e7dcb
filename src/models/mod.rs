pub mod lyric;
pub mod play_mode;
pub mod player_state;
pub mod playing_info;
pub mod playlist;
pub mod snapshot;
pub mod song;

pub use lyric::{LyricLine, LyricState, LyricWord, WordTimedLine};
pub use play_mode::PlayMode;
pub use player_state::PlayerState;
pub use playing_info::PlayingInfo;
pub use playlist::Playlist;
pub use snapshot::PlaylistSnapshot;
pub use song::{Album, Artist, Song};
