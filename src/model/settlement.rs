use super::*;
use crate::hand::fan::Fan;

// 勝者ごとの結算サマリ 初回和了時の凍結スナップショットから構築される
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerSummary {
    pub player_id: String,
    pub name: String,
    pub hand: Vec<Tile>,      // 和了牌を含む初回和了時の手牌
    pub fans: Vec<Fan>,       // 翻数の内訳 (評価順)
    pub payout_delta: Score,  // この局の和了による点数変動の累計
    pub is_drawn: bool,       // 初回和了が自摸かどうか
}

// 局終了時に永続化・配信層へ引き渡される結算レコード
// winnersが空の場合は流局 (全員和了なしで牌山が尽きた)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub winners: Vec<WinnerSummary>,
    pub timestamp: u64, // unix時間ms
}

impl Settlement {
    // 配信層へ渡すJSON表現 エンジン自体はI/Oを行わない
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

#[test]
fn test_settlement_json() {
    let s = Settlement {
        winners: vec![WinnerSummary {
            player_id: "p0".to_string(),
            name: "east".to_string(),
            hand: tiles_from_string("m111222333p1199").unwrap(),
            fans: vec![],
            payout_delta: 600,
            is_drawn: true,
        }],
        timestamp: 1700000000000,
    };
    let json = s.to_json();
    assert!(json.contains("\"p0\""));
    assert!(json.contains("\"payout_delta\":600"));
    assert!(json.contains("\"m1\""));
}
