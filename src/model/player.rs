use super::*;
use crate::hand::fan::FanContext;
use crate::util::misc::vec_to_string;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,                  // 接続クライアントの識別子 (局をまたいで不変)
    pub name: String,                // 表示名
    pub seat: Seat,                  // 座席番号
    pub score: Score,                // 持ち点 (局をまたぐ累計)
    pub hand: TileTable,             // 手牌 (3x10の枚数テーブル)
    pub drawn: Option<Tile>,         // 最後に獲得した牌 (ツモ牌または鳴いた牌)
    pub melds: Vec<Meld>,            // 公開面子一覧
    pub discards: Vec<Tile>,         // 捨て牌一覧 (古い順)
    pub void_suit: Option<Type>,     // 定缺 一度宣言したら局の終わりまで不変
    pub has_won: bool,               // 和了フラグ 局内で単調 (一度trueになれば局のリセットまでtrue)
    pub win_count: usize,            // この局の和了回数
    pub win_delta: Score,            // 和了による点数変動の累計
    pub first_win: Option<WinRecord>, // 初回和了時のスナップショット (結算表示用)
}

// 初回和了時の手牌と翻数の凍結記録
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinRecord {
    pub tiles: Vec<Tile>,     // 和了牌を含む手牌
    pub winning_tile: Tile,   // 和了牌
    pub fan: FanContext,      // 翻数の内訳
    pub is_drawn: bool,       // 自摸和了
}

impl Player {
    pub fn new(id: &str, name: &str, seat: Seat) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            seat,
            ..Self::default()
        }
    }

    // 局開始時のリセット idとnameと持ち点は引き継ぐ
    pub fn reset_for_round(&mut self) {
        self.hand = TileTable::default();
        self.drawn = None;
        self.melds = vec![];
        self.discards = vec![];
        self.void_suit = None;
        self.has_won = false;
        self.win_count = 0;
        self.win_delta = 0;
        self.first_win = None;
    }

    #[inline]
    pub fn count_tile(&self, t: Tile) -> usize {
        count_tile(&self.hand, t)
    }

    #[inline]
    pub fn hand_count(&self) -> usize {
        count_all(&self.hand)
    }

    // 定缺の牌が手牌に残っているか
    pub fn holds_void_suit(&self) -> bool {
        if let Some(ti) = self.void_suit {
            self.hand[ti][1..].iter().sum::<usize>() > 0
        } else {
            false
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "seat: {}, name: {}, score: {}, void: {:?}, won: {}x{}",
            self.seat, self.name, self.score, self.void_suit, self.has_won, self.win_count,
        )?;
        writeln!(f, "hand: {}", vec_to_string(&tiles_from_tile_table(&self.hand)))?;
        writeln!(f, "melds: {}", vec_to_string(&self.melds))?;
        write!(f, "discards: {}", vec_to_string(&self.discards))
    }
}
