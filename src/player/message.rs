use crate::media::PlayerState;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Load { path: String, media: i32 },
    Play(i32),
    Stop,
    Volume(u8),
    Fullscreen(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerReport {
    State {
        state: PlayerState,
        // untagged reports apply to whatever is loaded
        media: Option<i32>,
    },
    Volume(i32),
}
