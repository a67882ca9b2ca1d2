use super::*;

// 卓の設定 エンジンは参照するのみで所有しない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub seats: usize,      // 座席の数 (2~4)
    pub remove10: bool,    // 二人打ちの場合に配牌前に10枚抜くかどうか
    pub timeout_ms: u64,   // ターンのタイムアウト
    pub base_stake: Score, // 1倍あたりの基本点
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            seats: 4,
            remove10: false,
            timeout_ms: 15000,
            base_stake: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingPlayers,  // 席が揃うのを待機中
    VoidDeclaration,  // 定缺宣言フェーズ
    ActivePlay,       // 対局中
    Settlement,       // 結算
}

// 直前の捨て牌 いずれかの反応で消費されるか次のツモで暗黙に消える
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastDiscard {
    pub tile: Tile,
    pub from: Seat,
}

// 部屋単位のゲーム状態 外部の永続化・配信層がこのオブジェクトをそのまま扱う
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub rule: Rule,
    pub phase: Phase,
    pub players: Vec<Player>,          // 局開始時に確定する席順
    pub dealer: Seat,                  // 親 (常にseat 0)
    pub turn: Seat,                    // 手番の座席
    pub wall: Vec<Tile>,               // 牌山 末尾からツモ
    pub deck_count: usize,             // 配牌時の総枚数 (不変条件の検査用)
    pub last_discard: Option<LastDiscard>,
    pub claims: Option<ClaimWindow>,   // 捨て牌への反応の調停ウィンドウ
    pub turn_deadline: Option<u64>,    // 手番の期限 (unix時間ms) 再起動後も永続値から再判定する
    pub settlement: Option<Settlement>,
    pub aborted: bool,                 // 不変条件の破壊を検出した場合にセット 以後の操作は全て拒否
    pub step: usize,                   // 操作を適用する毎に+1
}

impl Room {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            phase: Phase::AwaitingPlayers,
            players: vec![],
            dealer: 0,
            turn: 0,
            wall: vec![],
            deck_count: 0,
            last_discard: None,
            claims: None,
            turn_deadline: None,
            settlement: None,
            aborted: false,
            step: 0,
        }
    }

    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        self.players.iter().position(|p| p.id == player_id)
    }

    #[inline]
    pub fn n_seats(&self) -> usize {
        self.rule.seats
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "phase: {:?}, turn: {}, wall: {}, last_discard: {:?}, deadline: {:?}",
            self.phase,
            self.turn,
            self.wall.len(),
            self.last_discard,
            self.turn_deadline,
        )?;
        let border = "-".repeat(80);
        write!(f, "{}", border)?;
        for p in &self.players {
            writeln!(f)?;
            writeln!(f, "{}", p)?;
            write!(f, "{}", border)?;
        }
        Ok(())
    }
}
