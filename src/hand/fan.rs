use super::win::is_seven_pairs;
use crate::model::*;

use serde::{Deserialize, Serialize};

// 役の名称 結算表示の契約の一部 (内訳の並び順も評価順で固定)
pub const FAN_FLUSH: &str = "flush";             // 清一色
pub const FAN_SEVEN_PAIRS: &str = "seven pairs"; // 七対子
pub const FAN_ALL_TRIPLES: &str = "all triples"; // 対々和
pub const FAN_QUADS: &str = "quads";             // 根 (4枚持ちの種類ごとに+1)
pub const FAN_SELF_DRAW: &str = "self draw";     // 自摸

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fan {
    pub name: String,
    pub fan: usize,
}

// 翻数評価の結果 同一入力に対して常に同一の出力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanContext {
    pub fans: Vec<Fan>,     // 内訳 (評価順)
    pub fan: usize,         // 合計翻数
    pub multiplier: u64,    // 2^fan
    pub payout: Score,      // 支払い単価 = 基本点 x 倍率 (対戦相手1人あたり)
}

// 翻数計算
// hand: 門前の手牌 (和了牌を含む), melds: 副露, winning_tile: 和了牌
// 固定の加算ルールセットであり差し替えは想定しない
pub fn calc_fan(
    hand: &TileTable,
    melds: &[Meld],
    _winning_tile: Tile,
    is_drawn: bool,
    base_stake: Score,
) -> FanContext {
    let mut fans = vec![];
    let mut total = 0;

    // 副露も含めた全体の枚数テーブル
    let mut all = *hand;
    for m in melds {
        for &t in &m.tiles {
            inc_tile(&mut all, t);
        }
    }

    // 清一色: 手牌と副露のすべてが単一の花色
    let n_suits = (0..TYPE)
        .filter(|&ti| all[ti][1..].iter().sum::<usize>() > 0)
        .count();
    if n_suits == 1 {
        fans.push(Fan { name: FAN_FLUSH.to_string(), fan: 2 });
        total += 2;
    }

    // 七対子: 門前14枚のみ
    let seven_pairs = melds.is_empty() && is_seven_pairs(hand);
    if seven_pairs {
        fans.push(Fan { name: FAN_SEVEN_PAIRS.to_string(), fan: 2 });
        total += 2;
    }

    // 対々和: 七対子でない場合のみ 門前の手牌に順子構造(連続3種)が存在しない
    if !seven_pairs {
        let mut has_run = false;
        for ti in 0..TYPE {
            for ni in 1..=7 {
                if hand[ti][ni] > 0 && hand[ti][ni + 1] > 0 && hand[ti][ni + 2] > 0 {
                    has_run = true;
                }
            }
        }
        if !has_run {
            fans.push(Fan { name: FAN_ALL_TRIPLES.to_string(), fan: 1 });
            total += 1;
        }
    }

    // 根: 手牌+副露で4枚揃っている種類ごとに+1
    let mut n_quads = 0;
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            if all[ti][ni] == 4 {
                n_quads += 1;
            }
        }
    }
    if n_quads > 0 {
        fans.push(Fan { name: FAN_QUADS.to_string(), fan: n_quads });
        total += n_quads;
    }

    // 自摸
    if is_drawn {
        fans.push(Fan { name: FAN_SELF_DRAW.to_string(), fan: 1 });
        total += 1;
    }

    let multiplier = 1u64 << total;
    FanContext {
        fans,
        fan: total,
        multiplier,
        payout: base_stake * multiplier as Score,
    }
}

#[cfg(test)]
fn hand(exp: &str) -> TileTable {
    tiles_to_tile_table(&tiles_from_string(exp).unwrap())
}

#[test]
fn test_fan_flush_quad_self_draw() {
    // 清一色(2) + 対々和(1) + 根x1(1) + 自摸(1) = 5翻
    let melds = vec![Meld {
        step: 0,
        meld_type: MeldType::Ankan,
        tiles: vec![Tile(TM, 2); 4],
        from: None,
    }];
    let h = hand("m111m333m55m999");
    let ctx = calc_fan(&h, &melds, Tile(TM, 9), true, 100);
    assert_eq!(ctx.fan, 5);
    assert_eq!(ctx.multiplier, 32);
    assert_eq!(ctx.payout, 3200);
    // 内訳は評価順で固定
    let names: Vec<&str> = ctx.fans.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec![FAN_FLUSH, FAN_ALL_TRIPLES, FAN_QUADS, FAN_SELF_DRAW]);
    assert_eq!(ctx.fans[2].fan, 1);
}

#[test]
fn test_fan_seven_pairs_skips_all_triples() {
    let h = hand("m1111m22m33p44p55s66");
    let ctx = calc_fan(&h, &[], Tile(TS, 6), false, 100);
    let names: Vec<&str> = ctx.fans.iter().map(|f| f.name.as_str()).collect();
    // 七対子(2) + 根x1(m1が4枚)
    assert_eq!(names, vec![FAN_SEVEN_PAIRS, FAN_QUADS]);
    assert_eq!(ctx.fan, 3);
    assert_eq!(ctx.multiplier, 8);
}

#[test]
fn test_fan_counts_melds() {
    // 副露の明槓も根と清一色の判定に含まれる
    let melds = vec![Meld {
        step: 0,
        meld_type: MeldType::Minkan,
        tiles: vec![Tile(TM, 9); 4],
        from: Some(1),
    }];
    let h = hand("m111m234m55");
    let ctx = calc_fan(&h, &melds, Tile(TM, 5), false, 100);
    let names: Vec<&str> = ctx.fans.iter().map(|f| f.name.as_str()).collect();
    // 順子があるため対々和はつかない
    assert_eq!(names, vec![FAN_FLUSH, FAN_QUADS]);
    assert_eq!(ctx.fan, 3);
}

#[test]
fn test_fan_zero() {
    let h = hand("m123m456p789p11s55s8");
    let ctx = calc_fan(&h, &[], Tile(TS, 8), false, 100);
    assert_eq!(ctx.fan, 0);
    assert_eq!(ctx.multiplier, 1);
    assert_eq!(ctx.payout, 100);
    assert!(ctx.fans.is_empty());
}

#[test]
fn test_fan_deterministic() {
    let h = hand("m111m2222m333m55");
    let a = calc_fan(&h, &[], Tile(TM, 5), true, 100);
    let b = calc_fan(&h, &[], Tile(TM, 5), true, 100);
    assert_eq!(a, b);
    assert_eq!(a.multiplier, 1u64 << a.fan);
}
