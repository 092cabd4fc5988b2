use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Enumeration order used for ghost tie-breaks.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Insane,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            "insane" => Some(Self::Insane),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Normal => "NORMAL",
            Self::Hard => "HARD",
            Self::Insane => "INSANE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Scatter,
    Chase,
    Frightened,
}

impl GhostMode {
    pub fn letter(self) -> char {
        match self {
            Self::Scatter => 'S',
            Self::Chase => 'C',
            Self::Frightened => 'F',
        }
    }

    pub fn from_letter(value: &str) -> Option<Self> {
        match value {
            "S" => Some(Self::Scatter),
            "C" => Some(Self::Chase),
            "F" => Some(Self::Frightened),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    Solo,
    Duo,
}

impl GameMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Solo => "SOLO",
            Self::Duo => "DUO",
        }
    }
}

/// Which process this engine is running in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Solo,
    LocalDuo,
    Host,
    Client,
}

impl Role {
    /// Host, local duo and solo run the full simulation; the client only predicts.
    pub fn is_authoritative(self) -> bool {
        !matches!(self, Self::Client)
    }

    pub fn is_duo(self) -> bool {
        !matches!(self, Self::Solo)
    }

    pub fn game_mode(self) -> GameMode {
        if self.is_duo() {
            GameMode::Duo
        } else {
            GameMode::Solo
        }
    }

    /// The player this process's primary key mapping drives.
    pub fn local_slot(self) -> PlayerSlot {
        match self {
            Self::Client => PlayerSlot::Two,
            _ => PlayerSlot::One,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostKind {
    Direct,
    Ambusher,
    Flanker,
    Threshold,
}

impl GhostKind {
    /// Creation order; index 0 is the reference ghost the flanker pivots on.
    pub const ALL: [GhostKind; 4] = [
        GhostKind::Direct,
        GhostKind::Ambusher,
        GhostKind::Flanker,
        GhostKind::Threshold,
    ];

    pub fn scatter_corner(self) -> Vec2 {
        match self {
            Self::Direct => Vec2::new(27, 0),
            Self::Ambusher => Vec2::new(0, 0),
            Self::Flanker => Vec2::new(27, 21),
            Self::Threshold => Vec2::new(0, 21),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPhase {
    Jailed,
    Releasing,
    Active,
    Eaten,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Menu,
    Running,
    Paused,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Won,
    Lost,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub slot: PlayerSlot,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "pixelX")]
    pub pixel_x: f64,
    #[serde(rename = "pixelY")]
    pub pixel_y: f64,
    pub dir: Direction,
    pub alive: bool,
    pub score: i32,
    #[serde(rename = "hasKey")]
    pub has_key: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub kind: GhostKind,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "pixelX")]
    pub pixel_x: f64,
    #[serde(rename = "pixelY")]
    pub pixel_y: f64,
    pub dir: Direction,
    pub phase: GhostPhase,
    pub target: Vec2,
    /// Diagnostic A* route to `target`; empty when unreachable.
    pub path: Vec<Vec2>,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, Serialize)]
pub struct RenderView {
    pub tick: u64,
    pub phase: MatchPhase,
    pub mode: GhostMode,
    #[serde(rename = "frightenedTicks")]
    pub frightened_ticks: u32,
    #[serde(rename = "pelletsEaten")]
    pub pellets_eaten: u32,
    #[serde(rename = "keySpawned")]
    pub key_spawned: bool,
    pub tiles: Vec<Vec<u8>>,
    pub players: Vec<PlayerView>,
    pub ghosts: Vec<GhostView>,
}

/// Emitted once per match for the persistence/menu collaborators.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub score: i32,
    pub difficulty: Difficulty,
    pub mode: GameMode,
    pub outcome: MatchOutcome,
    #[serde(rename = "finishedAt")]
    pub finished_at: String,
}
