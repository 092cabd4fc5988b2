use crate::types::{Direction, PlayerSlot, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    Enter,
    P,
    M,
    Escape,
}

impl Key {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "W" => Some(Self::W),
            "A" => Some(Self::A),
            "S" => Some(Self::S),
            "D" => Some(Self::D),
            "ENTER" => Some(Self::Enter),
            "P" => Some(Self::P),
            "M" => Some(Self::M),
            "ESC" | "ESCAPE" => Some(Self::Escape),
            _ => None,
        }
    }

    fn arrow(self) -> Option<Direction> {
        match self {
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            _ => None,
        }
    }

    fn wasd(self) -> Option<Direction> {
        match self {
            Self::W => Some(Direction::Up),
            Self::S => Some(Direction::Down),
            Self::A => Some(Direction::Left),
            Self::D => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaCommand {
    Start,
    TogglePause,
    Menu,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Move { slot: PlayerSlot, dir: Direction },
    Meta(MetaCommand),
}

/// Maps a key press to an event for this process. Arrows drive player one
/// wherever player one is local; WASD drives player two in local duo and
/// on the client.
pub fn resolve(role: Role, key: Key) -> Option<InputEvent> {
    let meta = match key {
        Key::Enter => Some(MetaCommand::Start),
        Key::P => Some(MetaCommand::TogglePause),
        Key::M => Some(MetaCommand::Menu),
        Key::Escape => Some(MetaCommand::Quit),
        _ => None,
    };
    if let Some(command) = meta {
        return Some(InputEvent::Meta(command));
    }

    let (slot, dir) = match role {
        Role::Solo | Role::Host => (PlayerSlot::One, key.arrow()?),
        Role::Client => (PlayerSlot::Two, key.wasd()?),
        Role::LocalDuo => match key.arrow() {
            Some(dir) => (PlayerSlot::One, dir),
            None => (PlayerSlot::Two, key.wasd()?),
        },
    };
    Some(InputEvent::Move { slot, dir })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_duo_splits_keyboard() {
        assert_eq!(
            resolve(Role::LocalDuo, Key::Left),
            Some(InputEvent::Move {
                slot: PlayerSlot::One,
                dir: Direction::Left
            })
        );
        assert_eq!(
            resolve(Role::LocalDuo, Key::W),
            Some(InputEvent::Move {
                slot: PlayerSlot::Two,
                dir: Direction::Up
            })
        );
    }

    #[test]
    fn client_ignores_arrows_and_drives_player_two() {
        assert_eq!(resolve(Role::Client, Key::Up), None);
        assert_eq!(
            resolve(Role::Client, Key::D),
            Some(InputEvent::Move {
                slot: PlayerSlot::Two,
                dir: Direction::Right
            })
        );
    }

    #[test]
    fn host_and_solo_only_drive_player_one() {
        assert_eq!(resolve(Role::Host, Key::S), None);
        assert_eq!(resolve(Role::Solo, Key::A), None);
        assert!(matches!(
            resolve(Role::Solo, Key::Down),
            Some(InputEvent::Move {
                slot: PlayerSlot::One,
                ..
            })
        ));
    }

    #[test]
    fn meta_keys_work_for_every_role() {
        for role in [Role::Solo, Role::LocalDuo, Role::Host, Role::Client] {
            assert_eq!(
                resolve(role, Key::Enter),
                Some(InputEvent::Meta(MetaCommand::Start))
            );
            assert_eq!(
                resolve(role, Key::Escape),
                Some(InputEvent::Meta(MetaCommand::Quit))
            );
        }
    }

    #[test]
    fn key_names_parse_case_insensitively() {
        assert_eq!(Key::parse(" w "), Some(Key::W));
        assert_eq!(Key::parse("esc"), Some(Key::Escape));
        assert_eq!(Key::parse("enter"), Some(Key::Enter));
        assert_eq!(Key::parse("space"), None);
    }
}
