use serde::{de, ser};

use super::*;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile(pub Type, pub Tnum); // (type index, number index)

impl Tile {
    pub fn from_symbol(s: &str) -> Result<Self, String> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 2 {
            return Err(format!("invalid tile symbol: '{}'", s));
        }
        let t = tile_type_from_char(chars[0]).ok_or(format!("invalid tile type: '{}'", s))?;
        let n = chars[1]
            .to_digit(10)
            .filter(|&n| (1..=9).contains(&n))
            .ok_or(format!("invalid tile number: '{}'", s))? as Tnum;
        Ok(Self(t, n))
    }

    pub fn unicode(&self) -> char {
        const TABLE: [&str; 3] = ["🀋🀇🀈🀉🀊🀋🀌🀍🀎🀏", "🀝🀙🀚🀛🀜🀝🀞🀟🀠🀡", "🀔🀐🀑🀒🀓🀔🀕🀖🀗🀘"];
        TABLE[self.0].chars().nth(self.1).unwrap()
    }
}

fn tile_type_from_char(c: char) -> Option<Type> {
    match c {
        'm' => Some(TM),
        'p' => Some(TP),
        's' => Some(TS),
        _ => None,
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ['m', 'p', 's'][self.0], self.1)
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl PartialOrd for Tile {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tile {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0, self.1).cmp(&(other.0, other.1))
    }
}

impl ser::Serialize for Tile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct TileVisitor;

impl<'de> de::Visitor<'de> for TileVisitor {
    type Value = Tile;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("tile symbol")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Tile::from_symbol(v).map_err(de::Error::custom)
    }
}

impl<'de> de::Deserialize<'de> for Tile {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as de::Deserializer<'de>>::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_str(TileVisitor)
    }
}

// [TileTable]
// 手牌などの牌の集合は種別x数字の枚数テーブルで保持する
pub type TileRow = [usize; TNUM];
pub type TileTable = [TileRow; TYPE];

#[inline]
pub fn count_tile(tt: &TileTable, t: Tile) -> usize {
    tt[t.0][t.1]
}

#[inline]
pub fn inc_tile(tt: &mut TileTable, t: Tile) {
    tt[t.0][t.1] += 1;
}

#[inline]
pub fn dec_tile(tt: &mut TileTable, t: Tile) {
    assert!(tt[t.0][t.1] > 0);
    tt[t.0][t.1] -= 1;
}

pub fn count_all(tt: &TileTable) -> usize {
    let mut n = 0;
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            n += tt[ti][ni];
        }
    }
    n
}

pub fn tiles_from_tile_table(tt: &TileTable) -> Vec<Tile> {
    let mut tiles = vec![];
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            for _ in 0..tt[ti][ni] {
                tiles.push(Tile(ti, ni));
            }
        }
    }
    tiles
}

pub fn tiles_to_tile_table(tiles: &[Tile]) -> TileTable {
    let mut tt = TileTable::default();
    for &t in tiles {
        inc_tile(&mut tt, t);
    }
    tt
}

pub fn tiles_from_string(exp: &str) -> Result<Vec<Tile>, String> {
    let mut tiles = vec![];
    let mut ti = None;
    for c in exp.chars() {
        match c {
            'm' | 'p' | 's' => ti = tile_type_from_char(c),
            '1'..='9' => {
                let ti = ti.ok_or("tile number before tile type".to_string())?;
                let ni = c.to_digit(10).unwrap() as Tnum;
                tiles.push(Tile(ti, ni));
            }
            _ => {
                return Err(format!("invalid char: '{}'", c));
            }
        }
    }
    Ok(tiles)
}

#[test]
fn test_tiletable() {
    let hand = tiles_from_string("m34777p123s567").unwrap();
    let tt = tiles_to_tile_table(&hand);
    assert_eq!(count_all(&tt), hand.len());
    assert_eq!(count_tile(&tt, Tile(TM, 7)), 3);
    let hand2 = tiles_from_tile_table(&tt);
    assert_eq!(hand, hand2);
}

#[test]
fn test_tile_symbol() {
    let t = Tile::from_symbol("p5").unwrap();
    assert_eq!(t, Tile(TP, 5));
    assert_eq!(t.to_string(), "p5");
    assert!(Tile::from_symbol("z1").is_err());
    assert!(Tile::from_symbol("m0").is_err());
}
