use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldType {
    Pon,    // 他家の捨て牌による明刻
    Anke,   // 倒牌時に公開される暗刻 (結算表示用, 対局中の操作では生成されない)
    Minkan, // 他家の捨て牌による明槓
    Ankan,  // 暗槓
    Kakan,  // 明刻への加槓
}

// 公開された面子 作成後は加槓による変化以外不変
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub step: usize,          // 作成時のstep
    pub meld_type: MeldType,
    pub tiles: Vec<Tile>,     // 同種同数の牌3枚または4枚
    pub from: Option<Seat>,   // Pon,Minkanの場合に捨てたプレイヤーの座席
}

impl Meld {
    #[inline]
    pub fn tile(&self) -> Tile {
        self.tiles[0]
    }
}

impl fmt::Display for Meld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.tiles.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", s.join("|"))
    }
}
