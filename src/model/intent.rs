use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentType {
    DeclareVoidSuit,   // 定缺宣言
    Draw,              // ツモ
    Discard,           // 打牌
    ClaimTriple,       // 碰
    ClaimQuadOpen,     // 直槓 (他家の捨て牌)
    ClaimQuadConcealed, // 暗槓
    ClaimQuadUpgrade,  // 加槓 (碰の明刻に追加)
    DeclareWin,        // 胡 (自摸または栄和)
    StartNextRound,    // 次局開始 (seat 0のみ)
}

// クライアントから提出される操作要求
// 現在のRoomに対して検証され,適用されるか型付きの拒否を返す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub ty: IntentType,
    pub actor: String,        // プレイヤーid
    pub tile: Option<Tile>,   // Discard, ClaimQuadConcealed, ClaimQuadUpgradeで使用
    pub suit: Option<Type>,   // DeclareVoidSuitで使用
}

impl Intent {
    #[inline]
    pub fn new(ty: IntentType, actor: &str) -> Self {
        Self {
            ty,
            actor: actor.to_string(),
            tile: None,
            suit: None,
        }
    }

    #[inline]
    pub fn declare_void_suit(actor: &str, suit: Type) -> Self {
        Self {
            suit: Some(suit),
            ..Self::new(IntentType::DeclareVoidSuit, actor)
        }
    }

    #[inline]
    pub fn draw(actor: &str) -> Self {
        Self::new(IntentType::Draw, actor)
    }

    #[inline]
    pub fn discard(actor: &str, t: Tile) -> Self {
        Self {
            tile: Some(t),
            ..Self::new(IntentType::Discard, actor)
        }
    }

    #[inline]
    pub fn claim_triple(actor: &str) -> Self {
        Self::new(IntentType::ClaimTriple, actor)
    }

    #[inline]
    pub fn claim_quad_open(actor: &str) -> Self {
        Self::new(IntentType::ClaimQuadOpen, actor)
    }

    #[inline]
    pub fn claim_quad_concealed(actor: &str, t: Tile) -> Self {
        Self {
            tile: Some(t),
            ..Self::new(IntentType::ClaimQuadConcealed, actor)
        }
    }

    #[inline]
    pub fn claim_quad_upgrade(actor: &str, t: Tile) -> Self {
        Self {
            tile: Some(t),
            ..Self::new(IntentType::ClaimQuadUpgrade, actor)
        }
    }

    #[inline]
    pub fn declare_win(actor: &str) -> Self {
        Self::new(IntentType::DeclareWin, actor)
    }

    #[inline]
    pub fn start_next_round(actor: &str) -> Self {
        Self::new(IntentType::StartNextRound, actor)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.ty, self.actor)?;
        if let Some(t) = self.tile {
            write!(f, "[{}]", t)?;
        }
        Ok(())
    }
}

// 操作の前提条件違反 状態変化なしで報告され,呼び出し側は別の操作を再提出できる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IllegalMove {
    WrongPhase,        // 現在のフェーズでは実行できない操作
    UnknownPlayer,     // 部屋に存在しないプレイヤー
    RoomFull,          // 席が埋まっている
    SeatsNotFilled,    // 席が揃っていない
    NotHost,           // seat 0のみが実行できる操作
    NotYourTurn,       // 手番ではない
    HandParity,        // 手牌の枚数が操作の前提と合わない (mod 3)
    TileNotInHand,     // 指定の牌を所持していない
    MissingPayload,    // 牌・花色の指定が欠けている
    AlreadyDeclared,   // 定缺は一度のみ
    VoidSuitRetained,  // 定缺の牌を残したまま他の牌は捨てられない
    VoidSuitClaim,     // 定缺の花色は鳴けない・和了れない
    AlreadyWon,        // 和了済みのプレイヤーは碰・直槓できない
    NoPendingDiscard,  // 反応対象の捨て牌が存在しない
    NotEligible,       // 反応の資格がない (枚数不足など)
    NotWinningHand,    // 和了形ではない
    RoomAborted,       // 破壊された部屋への操作
    UnknownRoom,       // 存在しない部屋への操作
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IntentError {
    Illegal(IllegalMove),  // 回復可能 呼び出し側が再試行してよい
    Corrupted(String),     // 不変条件の破壊 部屋全体を放棄し再試行してはならない
}

impl fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for IntentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentError::Illegal(m) => write!(f, "illegal action: {}", m),
            IntentError::Corrupted(s) => write!(f, "invariant violation: {}", s),
        }
    }
}

impl std::error::Error for IntentError {}

impl From<IllegalMove> for IntentError {
    fn from(m: IllegalMove) -> Self {
        IntentError::Illegal(m)
    }
}
