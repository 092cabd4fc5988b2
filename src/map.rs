use crate::types::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tile {
    Empty,
    Wall,
    Dot,
    PowerPellet,
    JailFloor,
    JailGate,
    Tunnel,
    /// Bonus fruit subtype 0..=6 (codes 9..=15).
    Bonus(u8),
    Key,
}

impl Tile {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 | 6 | 8 => Some(Self::Empty),
            1 => Some(Self::Wall),
            2 => Some(Self::Dot),
            3 => Some(Self::PowerPellet),
            4 => Some(Self::JailFloor),
            5 => Some(Self::JailGate),
            7 => Some(Self::Tunnel),
            9..=15 => Some(Self::Bonus(code - 9)),
            16 => Some(Self::Key),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Wall => 1,
            Self::Dot => 2,
            Self::PowerPellet => 3,
            Self::JailFloor => 4,
            Self::JailGate => 5,
            Self::Tunnel => 7,
            Self::Bonus(kind) => 9 + kind.min(6),
            Self::Key => 16,
        }
    }

    pub fn is_collectible(self) -> bool {
        matches!(
            self,
            Self::Dot | Self::PowerPellet | Self::Bonus(_) | Self::Key
        )
    }

    pub fn is_jail(self) -> bool {
        matches!(self, Self::JailFloor | Self::JailGate)
    }
}

/// One remaining collectible as carried on the wire: (row, col, code).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collectible {
    pub row: i32,
    pub col: i32,
    pub code: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapTemplate {
    Easy,
    Hard,
}

const EASY_TEMPLATE: [[u8; 28]; 12] = [
    [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],
    [1,3,2,2,2,2,2,2,2,2,2,2,2,1,1,2,2,2,2,2,2,2,2,2,2,2,3,1],
    [1,2,1,1,1,1,2,1,1,1,1,1,2,1,1,2,1,1,1,1,1,2,1,1,1,1,2,1],
    [1,2,1,1,1,1,2,1,1,1,1,1,2,1,1,2,1,1,1,1,1,2,1,1,1,1,2,1],
    [7,2,2,2,2,2,2,2,2,2,2,2,0,0,2,2,2,2,2,2,2,2,2,2,2,2,2,7],
    [1,1,1,1,2,1,1,1,2,1,1,4,5,5,4,1,1,2,1,1,1,2,1,1,1,1,1,1],
    [1,1,1,1,2,1,1,1,2,1,4,4,4,4,4,4,1,2,1,1,1,2,1,1,1,1,1,1],
    [1,2,2,2,2,2,2,2,2,1,1,1,1,1,1,1,1,2,2,2,2,2,2,2,2,2,2,1],
    [1,2,1,1,1,1,2,1,2,2,2,2,2,2,2,2,2,2,2,1,2,1,1,1,1,1,2,1],
    [1,2,1,1,1,1,2,1,1,1,2,1,1,1,1,1,1,2,1,1,2,1,1,1,1,1,2,1],
    [1,3,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,3,1],
    [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],
];

const HARD_TEMPLATE: [[u8; 28]; 22] = [
    [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],
    [1,2,2,2,2,2,2,2,2,2,2,2,2,1,1,2,2,2,2,2,2,2,2,2,2,2,2,1],
    [1,2,1,1,1,1,2,1,1,1,1,1,2,1,1,2,1,1,1,1,1,2,1,1,1,1,2,1],
    [1,3,1,1,1,1,2,1,1,1,1,1,2,1,1,2,1,1,1,1,1,2,1,1,1,1,3,1],
    [1,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,1],
    [1,2,1,1,1,1,2,1,1,2,1,1,1,1,1,1,1,1,2,1,1,2,1,1,1,1,2,1],
    [1,2,2,2,2,2,2,1,1,2,2,2,2,1,1,2,2,2,2,1,1,2,2,2,2,2,2,1],
    [1,1,1,1,1,1,2,1,1,1,1,1,0,1,1,0,1,1,1,1,1,2,1,1,1,1,1,1],
    [0,0,0,0,0,1,2,1,1,0,0,0,0,0,0,0,0,0,0,1,1,2,1,0,0,0,0,0],
    [1,1,1,1,1,1,2,1,1,0,1,1,4,5,5,4,1,1,0,1,1,2,1,1,1,1,1,1],
    [7,0,0,0,0,0,2,0,0,0,1,4,4,4,4,4,4,1,0,0,0,2,0,0,0,0,0,7],
    [1,1,1,1,1,1,2,1,1,0,1,4,4,4,4,4,4,1,0,1,1,2,1,1,1,1,1,1],
    [0,0,0,0,0,1,2,1,1,0,1,1,1,1,1,1,1,1,0,1,1,2,1,0,0,0,0,0],
    [1,1,1,1,1,1,2,1,1,0,2,2,2,2,2,2,2,2,0,1,1,2,1,1,1,1,1,1],
    [1,2,2,2,2,2,2,2,2,2,1,1,1,2,1,1,1,2,2,2,2,2,2,2,2,2,2,1],
    [1,2,1,1,1,1,2,1,1,1,1,1,2,1,1,2,1,1,1,1,1,2,1,1,1,1,2,1],
    [1,3,2,2,1,1,2,2,2,2,2,2,2,0,0,2,2,2,2,2,2,2,1,1,2,2,3,1],
    [1,1,1,2,1,1,2,1,1,2,1,1,1,1,1,1,1,1,2,1,1,2,1,1,2,1,1,1],
    [1,2,2,2,2,2,2,1,1,2,2,2,2,1,1,2,2,2,2,1,1,2,2,2,2,2,2,1],
    [1,2,1,1,1,1,1,1,1,1,1,1,2,1,1,2,1,1,1,1,1,1,1,1,1,1,2,1],
    [1,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,1],
    [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],
];

/// Row-major tile grid; `(x, y)` is `(col, row)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    width: i32,
    height: i32,
    rows: Vec<Vec<Tile>>,
}

impl TileMap {
    pub fn from_template(template: MapTemplate) -> Self {
        match template {
            MapTemplate::Easy => Self::from_codes(&EASY_TEMPLATE),
            MapTemplate::Hard => Self::from_codes(&HARD_TEMPLATE),
        }
    }

    /// Builds a map from raw tile codes; unknown codes load as walls.
    pub fn from_codes<R: AsRef<[u8]>>(rows: &[R]) -> Self {
        let rows: Vec<Vec<Tile>> = rows
            .iter()
            .map(|row| {
                row.as_ref()
                    .iter()
                    .map(|code| Tile::from_code(*code).unwrap_or(Tile::Wall))
                    .collect()
            })
            .collect();
        let width = rows.first().map(|row| row.len()).unwrap_or(0) as i32;
        Self {
            width,
            height: rows.len() as i32,
            rows,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Tile> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.rows
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
    }

    pub fn set(&mut self, x: i32, y: i32, tile: Tile) {
        if !self.in_bounds(x, y) {
            return;
        }
        if let Some(cell) = self
            .rows
            .get_mut(y as usize)
            .and_then(|row| row.get_mut(x as usize))
        {
            *cell = tile;
        }
    }

    /// Walls always block; jail tiles block unless `through_jail`.
    pub fn is_passable(&self, x: i32, y: i32, through_jail: bool) -> bool {
        match self.get(x, y) {
            None | Some(Tile::Wall) => false,
            Some(tile) if tile.is_jail() => through_jail,
            Some(_) => true,
        }
    }

    /// Removes and returns a collectible at `(x, y)`, if any.
    pub fn take_collectible(&mut self, x: i32, y: i32) -> Option<Tile> {
        let tile = self.get(x, y)?;
        if !tile.is_collectible() {
            return None;
        }
        self.set(x, y, Tile::Empty);
        Some(tile)
    }

    pub fn collectibles(&self) -> Vec<Collectible> {
        let mut out = Vec::new();
        for (row, tiles) in self.rows.iter().enumerate() {
            for (col, tile) in tiles.iter().enumerate() {
                if tile.is_collectible() {
                    out.push(Collectible {
                        row: row as i32,
                        col: col as i32,
                        code: tile.code(),
                    });
                }
            }
        }
        out
    }

    pub fn has_collectibles(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.iter().any(|tile| tile.is_collectible()))
    }

    /// Replaces every collectible with the authoritative set; anything else in
    /// the list is ignored.
    pub fn replace_collectibles(&mut self, items: &[Collectible]) {
        for row in &mut self.rows {
            for tile in row.iter_mut() {
                if tile.is_collectible() {
                    *tile = Tile::Empty;
                }
            }
        }
        for item in items {
            let Some(tile) = Tile::from_code(item.code) else {
                continue;
            };
            if tile.is_collectible() {
                self.set(item.col, item.row, tile);
            }
        }
    }

    pub fn cells_of(&self, wanted: Tile) -> Vec<Vec2> {
        let mut out = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if *tile == wanted {
                    out.push(Vec2::new(x as i32, y as i32));
                }
            }
        }
        out
    }

    pub fn codes(&self) -> Vec<Vec<u8>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|tile| tile.code()).collect())
            .collect()
    }

    pub fn clamp(&self, cell: Vec2) -> Vec2 {
        Vec2::new(
            cell.x.clamp(0, (self.width - 1).max(0)),
            cell.y.clamp(0, (self.height - 1).max(0)),
        )
    }

    /// Ghost spawn candidates in the 5x5 window around `nominal` that are
    /// empty or jail tiles, scanned row by row. When none exist, returns
    /// fixed offsets from `nominal` that are not checked against the map.
    pub fn jail_spawn_cells(&self, nominal: Vec2) -> (Vec<Vec2>, bool) {
        let mut out = Vec::new();
        for y in (nominal.y - 2).max(0)..(nominal.y + 3).min(self.height) {
            for x in (nominal.x - 2).max(0)..(nominal.x + 3).min(self.width) {
                if matches!(
                    self.get(x, y),
                    Some(Tile::Empty | Tile::JailFloor | Tile::JailGate)
                ) {
                    out.push(Vec2::new(x, y));
                }
            }
        }
        if !out.is_empty() {
            return (out, false);
        }
        let fallback = [0, 1, -1, 2]
            .iter()
            .map(|dx| Vec2::new(nominal.x + dx, nominal.y))
            .collect();
        (fallback, true)
    }
}
