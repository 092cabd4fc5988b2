use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::map::Collectible;
use crate::types::{Direction, GhostMode, Vec2};

use super::snapshot::{GhostSnapshot, PlayerSnapshot, Snapshot};

/// Positional STATE layout this codec reads and writes.
pub const STATE_LAYOUT_VERSION: u8 = 1;

const FIXED_STATE_FIELDS: usize = 56;
const GHOSTS_ON_WIRE: usize = 4;
/// Index of the collectible count within the STATE fields.
const COLLECTIBLE_COUNT_INDEX: usize = 52;

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Input { dir: Direction, tick: Option<u64> },
    State(Box<Snapshot>),
    UdpPort(u16),
    GameStart,
}

impl Message {
    pub fn encode(&self) -> String {
        match self {
            Self::Input { dir, tick: Some(tick) } => format!("INPUT:{}:{tick}", dir.as_str()),
            Self::Input { dir, tick: None } => format!("INPUT:{}", dir.as_str()),
            Self::State(snapshot) => format!("STATE:{}", encode_state(snapshot)),
            Self::UdpPort(port) => format!("UDPPORT:{port}"),
            Self::GameStart => "GAMESTART".to_string(),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let line = raw.trim();
        if line == "GAMESTART" {
            return Ok(Self::GameStart);
        }
        let Some((kind, body)) = line.split_once(':') else {
            return Err(ProtocolError::UnknownMessage(line.to_string()));
        };
        match kind {
            "INPUT" => {
                let mut parts = body.split(':');
                let token = parts.next().unwrap_or_default();
                let dir = Direction::parse(token)
                    .ok_or_else(|| ProtocolError::BadDirection(token.to_string()))?;
                let tick = match parts.next() {
                    None => None,
                    Some(raw) => Some(parse_number(raw)?),
                };
                Ok(Self::Input { dir, tick })
            }
            "STATE" => Ok(Self::State(Box::new(decode_state(body)?))),
            "UDPPORT" => Ok(Self::UdpPort(parse_number(body)?)),
            _ => Err(ProtocolError::UnknownMessage(line.to_string())),
        }
    }
}

fn flag(value: bool) -> char {
    if value {
        '1'
    } else {
        '0'
    }
}

fn encode_state(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for player in &snapshot.players {
        match player {
            Some(player) => {
                let _ = write!(
                    out,
                    "{},{},{},{},{},",
                    player.cell.x,
                    player.cell.y,
                    player.pixel_x,
                    player.pixel_y,
                    player.dir.as_str()
                );
            }
            None => out.push_str("-1,-1,-1,-1,RIGHT,"),
        }
    }
    let _ = write!(
        out,
        "{},{},{},{},{},{},{},{},{},{},",
        snapshot.scores[0],
        snapshot.scores[1],
        flag(snapshot.alive[0]),
        flag(snapshot.alive[1]),
        snapshot.mode.letter(),
        snapshot.frightened_ticks,
        snapshot.pellets_eaten,
        flag(snapshot.has_key[0]),
        flag(snapshot.has_key[1]),
        flag(snapshot.key_spawned),
    );
    for ghost in snapshot.ghosts.iter().take(GHOSTS_ON_WIRE) {
        let _ = write!(
            out,
            "{},{},{},{},{},{},{},{},",
            ghost.cell.x,
            ghost.cell.y,
            ghost.pixel_x,
            ghost.pixel_y,
            flag(ghost.eaten),
            flag(ghost.jailed),
            ghost.jail_ticks,
            ghost.dir.as_str(),
        );
    }
    let _ = write!(out, "{},", snapshot.collectibles.len());
    for item in &snapshot.collectibles {
        let _ = write!(out, "{},{},{},", item.row, item.col, item.code);
    }
    let _ = write!(
        out,
        "{},{},{}",
        snapshot.seq, snapshot.global_tick, snapshot.sim_tick
    );
    out
}

fn decode_state(body: &str) -> Result<Snapshot, ProtocolError> {
    let fields: Vec<&str> = body.split(',').map(str::trim).collect();
    if fields.len() <= COLLECTIBLE_COUNT_INDEX {
        return Err(ProtocolError::FieldCount {
            expected: FIXED_STATE_FIELDS,
            actual: fields.len(),
        });
    }
    let count: usize = parse_number(fields[COLLECTIBLE_COUNT_INDEX])?;
    let expected = count
        .checked_mul(3)
        .and_then(|extra| extra.checked_add(FIXED_STATE_FIELDS))
        .ok_or_else(|| ProtocolError::BadNumber(fields[COLLECTIBLE_COUNT_INDEX].to_string()))?;
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            expected,
            actual: fields.len(),
        });
    }

    let mut reader = FieldReader::new(&fields);
    let players = [reader.player()?, reader.player()?];
    let scores = [reader.number()?, reader.number()?];
    let alive = [reader.flag()?, reader.flag()?];
    let mode = reader.mode()?;
    let frightened_ticks = reader.number()?;
    let pellets_eaten = reader.number()?;
    let has_key = [reader.flag()?, reader.flag()?];
    let key_spawned = reader.flag()?;
    let mut ghosts = Vec::with_capacity(GHOSTS_ON_WIRE);
    for _ in 0..GHOSTS_ON_WIRE {
        ghosts.push(GhostSnapshot {
            cell: Vec2::new(reader.number()?, reader.number()?),
            pixel_x: reader.number()?,
            pixel_y: reader.number()?,
            eaten: reader.flag()?,
            jailed: reader.flag()?,
            jail_ticks: reader.number()?,
            dir: reader.direction()?,
        });
    }
    let _count: usize = reader.number()?;
    let mut collectibles = Vec::with_capacity(count);
    for _ in 0..count {
        collectibles.push(Collectible {
            row: reader.number()?,
            col: reader.number()?,
            code: reader.number()?,
        });
    }

    Ok(Snapshot {
        players,
        scores,
        alive,
        mode,
        frightened_ticks,
        pellets_eaten,
        has_key,
        key_spawned,
        ghosts,
        collectibles,
        seq: reader.number()?,
        global_tick: reader.number()?,
        sim_tick: reader.number()?,
    })
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, ProtocolError> {
    raw.trim()
        .parse()
        .map_err(|_| ProtocolError::BadNumber(raw.to_string()))
}

struct FieldReader<'a> {
    fields: &'a [&'a str],
    index: usize,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a [&'a str]) -> Self {
        Self { fields, index: 0 }
    }

    fn token(&mut self) -> Result<&'a str, ProtocolError> {
        let token = self
            .fields
            .get(self.index)
            .copied()
            .ok_or_else(|| ProtocolError::MalformedSnapshot {
                reason: format!("layout v{STATE_LAYOUT_VERSION}: missing field {}", self.index),
            })?;
        self.index += 1;
        Ok(token)
    }

    fn number<T: FromStr>(&mut self) -> Result<T, ProtocolError> {
        parse_number(self.token()?)
    }

    fn flag(&mut self) -> Result<bool, ProtocolError> {
        let index = self.index;
        match self.token()? {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(ProtocolError::MalformedSnapshot {
                reason: format!("layout v{STATE_LAYOUT_VERSION}: field {index} is not a flag: {other}"),
            }),
        }
    }

    fn direction(&mut self) -> Result<Direction, ProtocolError> {
        let token = self.token()?;
        Direction::parse(token).ok_or_else(|| ProtocolError::BadDirection(token.to_string()))
    }

    fn mode(&mut self) -> Result<GhostMode, ProtocolError> {
        let token = self.token()?;
        GhostMode::from_letter(token).ok_or_else(|| ProtocolError::MalformedSnapshot {
            reason: format!("layout v{STATE_LAYOUT_VERSION}: unknown mode letter {token}"),
        })
    }

    fn player(&mut self) -> Result<Option<PlayerSnapshot>, ProtocolError> {
        let x: i32 = self.number()?;
        let y: i32 = self.number()?;
        let pixel_x = self.number()?;
        let pixel_y = self.number()?;
        let dir = self.direction()?;
        if x < 0 || y < 0 {
            return Ok(None);
        }
        Ok(Some(PlayerSnapshot {
            cell: Vec2::new(x, y),
            pixel_x,
            pixel_y,
            dir,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            players: [
                Some(PlayerSnapshot {
                    cell: Vec2::new(14, 10),
                    pixel_x: 350,
                    pixel_y: 249,
                    dir: Direction::Left,
                }),
                None,
            ],
            scores: [120, 0],
            alive: [true, false],
            mode: GhostMode::Frightened,
            frightened_ticks: 311,
            pellets_eaten: 2,
            has_key: [false, true],
            key_spawned: true,
            ghosts: vec![
                GhostSnapshot {
                    cell: Vec2::new(12, 4),
                    pixel_x: 300,
                    pixel_y: 100,
                    eaten: false,
                    jailed: true,
                    jail_ticks: 17,
                    dir: Direction::Up,
                };
                4
            ],
            collectibles: vec![
                Collectible { row: 1, col: 1, code: 3 },
                Collectible { row: 4, col: 5, code: 16 },
            ],
            seq: 9,
            global_tick: 4_000,
            sim_tick: 4_060,
        }
    }

    #[test]
    fn state_line_has_fixed_layout() {
        let line = Message::State(Box::new(sample_snapshot())).encode();
        let body = line.strip_prefix("STATE:").expect("state prefix");
        let fields: Vec<&str> = body.split(',').collect();
        assert_eq!(fields.len(), 56 + 3 * 2);
        assert_eq!(&fields[..10], &["14", "10", "350", "249", "LEFT", "-1", "-1", "-1", "-1", "RIGHT"]);
        assert_eq!(fields[14], "F");
        assert_eq!(fields[52], "2");
        assert_eq!(&fields[fields.len() - 3..], &["9", "4000", "4060"]);
    }

    #[test]
    fn state_decodes_what_it_encodes() {
        let snapshot = sample_snapshot();
        let line = Message::State(Box::new(snapshot.clone())).encode();
        assert_eq!(Message::decode(&line), Ok(Message::State(Box::new(snapshot))));
    }

    #[test]
    fn state_with_wrong_field_count_is_rejected() {
        let line = Message::State(Box::new(sample_snapshot())).encode();
        let truncated = line.rsplit_once(',').map(|(head, _)| head).unwrap_or_default();
        assert!(matches!(
            Message::decode(truncated),
            Err(ProtocolError::FieldCount {
                expected: 62,
                actual: 61
            })
        ));
        assert!(matches!(
            Message::decode("STATE:1,2,3"),
            Err(ProtocolError::FieldCount { .. })
        ));
    }

    #[test]
    fn state_with_non_numeric_field_is_rejected() {
        let line = Message::State(Box::new(sample_snapshot())).encode();
        let broken = line.replacen("350", "abc", 1);
        assert_eq!(
            Message::decode(&broken),
            Err(ProtocolError::BadNumber("abc".to_string()))
        );
        let broken = line.replacen(",F,", ",Q,", 1);
        assert!(matches!(
            Message::decode(&broken),
            Err(ProtocolError::MalformedSnapshot { .. })
        ));
    }

    #[test]
    fn input_tick_is_optional() {
        assert_eq!(
            Message::decode("INPUT:UP"),
            Ok(Message::Input {
                dir: Direction::Up,
                tick: None
            })
        );
        assert_eq!(
            Message::decode("INPUT:LEFT:812\n"),
            Ok(Message::Input {
                dir: Direction::Left,
                tick: Some(812)
            })
        );
        assert_eq!(
            Message::Input {
                dir: Direction::Down,
                tick: Some(3)
            }
            .encode(),
            "INPUT:DOWN:3"
        );
        assert_eq!(
            Message::decode("INPUT:SIDEWAYS"),
            Err(ProtocolError::BadDirection("SIDEWAYS".to_string()))
        );
    }

    #[test]
    fn control_messages() {
        assert_eq!(Message::decode("GAMESTART"), Ok(Message::GameStart));
        assert_eq!(Message::decode("UDPPORT:5556"), Ok(Message::UdpPort(5556)));
        assert_eq!(Message::UdpPort(5556).encode(), "UDPPORT:5556");
        assert!(matches!(
            Message::decode("UDPPORT:99999"),
            Err(ProtocolError::BadNumber(_))
        ));
        assert!(matches!(
            Message::decode("HELLO"),
            Err(ProtocolError::UnknownMessage(_))
        ));
    }
}
