use crate::model::*;

// [和了形判定]
// 副露は作成時に検証済みのため判定の対象は常に門前の手牌のみ

// 七対子または通常形(面子+雀頭)
pub fn is_winning_hand(hand: &TileTable, has_melds: bool) -> bool {
    if !has_melds && is_seven_pairs(hand) {
        return true;
    }
    is_standard_win(hand)
}

// 七対子 門前14枚が7つの対子に分解できる (4枚は対子2つと数える)
pub fn is_seven_pairs(hand: &TileTable) -> bool {
    if count_all(hand) != 14 {
        return false;
    }
    let mut n_pair = 0;
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            match hand[ti][ni] {
                0 => {}
                2 => n_pair += 1,
                4 => n_pair += 2,
                _ => return false,
            }
        }
    }
    n_pair == 7
}

// 通常形 雀頭候補を外してみて残りが面子のみで構成できるか検査
pub fn is_standard_win(hand: &TileTable) -> bool {
    if count_all(hand) % 3 != 2 {
        return false;
    }
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            if hand[ti][ni] >= 2 {
                let mut h = *hand;
                h[ti][ni] -= 2;
                if is_melds_only(&h) {
                    return true;
                }
            }
        }
    }
    false
}

// 刻子と順子のみに分解できるかの再帰判定 空の場合は真(空虚な成立)
// 分岐ごとにテーブルのコピーを取るため共有可変状態はない
pub fn is_melds_only(hand: &TileTable) -> bool {
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            if hand[ti][ni] == 0 {
                continue;
            }
            // 最小の牌は刻子の一部か順子の先頭のいずれかでしか消費できない
            if hand[ti][ni] >= 3 {
                let mut h = *hand;
                h[ti][ni] -= 3;
                if is_melds_only(&h) {
                    return true;
                }
            }
            if ni + 2 < TNUM && hand[ti][ni + 1] > 0 && hand[ti][ni + 2] > 0 {
                let mut h = *hand;
                h[ti][ni] -= 1;
                h[ti][ni + 1] -= 1;
                h[ti][ni + 2] -= 1;
                if is_melds_only(&h) {
                    return true;
                }
            }
            return false;
        }
    }
    true
}

#[cfg(test)]
fn hand(exp: &str) -> TileTable {
    tiles_to_tile_table(&tiles_from_string(exp).unwrap())
}

#[test]
fn test_standard_win() {
    // 4面子+雀頭
    assert!(is_winning_hand(&hand("m123m456m789p111p55"), false));
    // 刻子と順子の混在,雀頭候補が複数
    assert!(is_winning_hand(&hand("m111m22m333p456s789"), false));
    // 副露2組の場合 (門前8枚)
    assert!(is_winning_hand(&hand("m123p77s111"), true));
    // 和了形ではない
    assert!(!is_winning_hand(&hand("m123m456m789p111p56"), false));
    assert!(!is_winning_hand(&hand("m123m456m789p1199"), false));
}

#[test]
fn test_win_order_independent() {
    // 枚数テーブルは並び順の情報を持たないため同一の多重集合は常に同じ結果
    let a = hand("m123m456m789p111p55");
    let b = tiles_to_tile_table(&{
        let mut v = tiles_from_string("p55p111m789m456m123").unwrap();
        v.reverse();
        v
    });
    assert_eq!(a, b);
    assert!(is_winning_hand(&b, false));
}

#[test]
fn test_seven_pairs() {
    // 6種のうち1つが4枚 (対子2つと数える)
    assert!(is_seven_pairs(&hand("m1111m22m33p44p55s66")));
    assert!(is_winning_hand(&hand("m1111m22m33p44p55s66"), false));
    // 副露がある場合は七対子にならない
    assert!(!is_winning_hand(&hand("m1111m22m33p44p55s66"), true));
    // 3枚が混ざると不成立
    assert!(!is_seven_pairs(&hand("m111m222m33p44p55s6")));
    // 13枚では不成立
    assert!(!is_seven_pairs(&hand("m11m22m33p44p55s667")));
}

#[test]
fn test_empty_is_vacuous_win() {
    // 再帰の基底 空の多重集合は面子分解の成功
    assert!(is_melds_only(&TileTable::default()));
}
