use crate::model::*;

// 手番時計 deadlineはunix時間msで部屋の状態として永続化され,
// 読み出し側(poll/apply)が期限超過を検出して自動行動を合成する
pub fn deadline_passed(room: &Room, now: u64) -> bool {
    room.phase == Phase::ActivePlay && room.turn_deadline.map_or(false, |dl| now > dl)
}

// タイムアウト時の自動打牌の選択
// 定缺の牌が残っていれば最小のもの,なければ直近に獲得した牌,それもなければ最小の牌
pub fn auto_discard_tile(pl: &Player) -> Option<Tile> {
    if let Some(ti) = pl.void_suit {
        for ni in 1..TNUM {
            if pl.hand[ti][ni] > 0 {
                return Some(Tile(ti, ni));
            }
        }
    }
    if let Some(t) = pl.drawn {
        if pl.count_tile(t) > 0 {
            return Some(t);
        }
    }
    lowest_tile(&pl.hand)
}

fn lowest_tile(hand: &TileTable) -> Option<Tile> {
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            if hand[ti][ni] > 0 {
                return Some(Tile(ti, ni));
            }
        }
    }
    None
}

#[test]
fn test_auto_discard_prefers_void_suit() {
    let mut pl = Player::new("p0", "p0", 0);
    pl.hand = tiles_to_tile_table(&tiles_from_string("m37p18s2").unwrap());
    pl.void_suit = Some(TM);
    pl.drawn = Some(Tile(TS, 2));
    assert_eq!(auto_discard_tile(&pl), Some(Tile(TM, 3)));
}

#[test]
fn test_auto_discard_drawn_then_lowest() {
    let mut pl = Player::new("p0", "p0", 0);
    pl.hand = tiles_to_tile_table(&tiles_from_string("p18s2").unwrap());
    pl.void_suit = Some(TM);
    pl.drawn = Some(Tile(TS, 2));
    assert_eq!(auto_discard_tile(&pl), Some(Tile(TS, 2)));

    pl.drawn = None;
    assert_eq!(auto_discard_tile(&pl), Some(Tile(TP, 1)));
}
