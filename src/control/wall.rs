use rand::prelude::*;

use crate::model::*;

// 牌山を生成 3花色x9種x4枚の108枚 (字牌なし)
// 二人打ちでremove10が有効な場合,シャッフル後に先頭(ツモは末尾から)の10枚を除外
pub fn create_wall(seed: u64, rule: &Rule) -> Vec<Tile> {
    let mut wall = Vec::with_capacity(DECK);
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            for _ in 0..TILE {
                wall.push(Tile(ti, ni));
            }
        }
    }

    let mut rng: rand::rngs::StdRng = rand::SeedableRng::seed_from_u64(seed);
    wall.shuffle(&mut rng);

    if rule.seats == 2 && rule.remove10 {
        wall.drain(0..10);
    }
    wall
}

#[test]
fn test_wall_composition() {
    let wall = create_wall(1, &Rule::default());
    assert_eq!(wall.len(), DECK);
    let tt = tiles_to_tile_table(&wall);
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            assert_eq!(tt[ti][ni], TILE);
        }
    }
}

#[test]
fn test_wall_remove10() {
    let rule = Rule {
        seats: 2,
        remove10: true,
        ..Rule::default()
    };
    let wall = create_wall(7, &rule);
    assert_eq!(wall.len(), DECK - 10);
    let tt = tiles_to_tile_table(&wall);
    for ti in 0..TYPE {
        for ni in 1..TNUM {
            assert!(tt[ti][ni] <= TILE);
        }
    }
}

#[test]
fn test_wall_shuffle_distribution() {
    // シャッフルの一様性の検査 (アルゴリズムの同一性ではなく分布で確認)
    // m1の1枚目が現れる位置の平均が中央付近に収束すること,
    // および先頭の牌が十分に散らばることを確認する
    let rule = Rule::default();
    let n = 2000;
    let mut pos_sum = 0usize;
    let mut firsts = std::collections::HashSet::new();
    for seed in 0..n {
        let wall = create_wall(seed, &rule);
        pos_sum += wall.iter().position(|&t| t == Tile(TM, 1)).unwrap();
        firsts.insert(wall[0]);
    }
    // m1は4枚あるため1枚目の出現位置の期待値は約 108/5 = 21.6
    let avg = pos_sum as f64 / n as f64;
    assert!((15.0..30.0).contains(&avg), "avg = {}", avg);
    // 27種のうち大半が先頭に現れる
    assert!(firsts.len() > 20, "firsts = {}", firsts.len());
}
