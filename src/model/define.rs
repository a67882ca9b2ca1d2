// 基本的な型エイリアスと定数

pub type Seat = usize; // 座席番号 (0=親)
pub type Type = usize; // 牌の花色
pub type Tnum = usize; // 牌の数字 (1..=9)
pub type Score = i32; // 点数

// 花色 字牌は存在しない
pub const TM: Type = 0; // 萬子
pub const TP: Type = 1; // 筒子
pub const TS: Type = 2; // 索子

pub const TYPE: usize = 3; // 花色の数
pub const TNUM: usize = 10; // 数字の範囲 (0は未使用)
pub const TILE: usize = 4; // 同種の牌の枚数
pub const DECK: usize = TYPE * 9 * TILE; // 牌山の総枚数 (108)
