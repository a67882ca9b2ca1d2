use super::*;

// 捨て牌に対する反応の種別 数値が小さいほど優先
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimKind {
    Win,    // 胡 (栄和)
    Quad,   // 直槓
    Triple, // 碰
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimOffer {
    pub seat: Seat,
    pub kind: ClaimKind,
}

// 捨て牌ひとつに対する反応の調停ウィンドウ
// 全席の反応可能性を捨て牌の時点で列挙し,優先度の高い反応が未回答のうちは
// 低い反応をコミットしない (先着順の競合を排除)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimWindow {
    pub tile: Tile,                // 対象の捨て牌
    pub from: Seat,                // 捨てたプレイヤー
    pub offers: Vec<ClaimOffer>,   // 反応可能な(座席,種別)の全列挙
    pub recorded: Vec<ClaimOffer>, // 実際に提出された反応
}

impl ClaimWindow {
    pub fn new(tile: Tile, from: Seat, offers: Vec<ClaimOffer>) -> Self {
        Self {
            tile,
            from,
            offers,
            recorded: vec![],
        }
    }

    // 優先順位 (種別, 放銃者から時計回りの距離)
    fn rank(&self, offer: &ClaimOffer, n_seats: usize) -> (ClaimKind, usize) {
        let dist = (offer.seat + n_seats - self.from) % n_seats;
        (offer.kind, dist)
    }

    pub fn has_offer(&self, seat: Seat, kind: ClaimKind) -> bool {
        self.offers.iter().any(|o| o.seat == seat && o.kind == kind)
    }

    // 反応を記録 同じ座席の記録は1つのみ (上書きは他の反応可能性の放棄を意味する)
    pub fn record(&mut self, seat: Seat, kind: ClaimKind) {
        self.recorded.retain(|o| o.seat != seat);
        self.recorded.push(ClaimOffer { seat, kind });
    }

    // 記録済みの反応のうち最も優先度の高いもの
    pub fn best_recorded(&self, n_seats: usize) -> Option<ClaimOffer> {
        self.recorded
            .iter()
            .min_by_key(|o| self.rank(o, n_seats))
            .copied()
    }

    // まだ回答していない座席の反応可能性を含めた全候補のうちの最良
    fn best_possible(&self, n_seats: usize) -> Option<ClaimOffer> {
        let answered: Vec<Seat> = self.recorded.iter().map(|o| o.seat).collect();
        self.offers
            .iter()
            .filter(|o| !answered.contains(&o.seat))
            .chain(self.recorded.iter())
            .min_by_key(|o| self.rank(o, n_seats))
            .copied()
    }

    // 記録済みの最良反応が,未回答の席を待たずに確定できるか
    pub fn ready(&self, n_seats: usize) -> Option<ClaimOffer> {
        let best = self.best_recorded(n_seats)?;
        if self.best_possible(n_seats) == Some(best) {
            Some(best)
        } else {
            None
        }
    }
}

#[test]
fn test_claim_priority() {
    // seat0の捨て牌に対してseat1が碰,seat2が胡
    let offers = vec![
        ClaimOffer { seat: 1, kind: ClaimKind::Triple },
        ClaimOffer { seat: 2, kind: ClaimKind::Win },
    ];
    let mut w = ClaimWindow::new(Tile(TM, 5), 0, offers);

    // 碰が先に提出されても胡が未回答のうちは確定しない
    w.record(1, ClaimKind::Triple);
    assert_eq!(w.ready(4), None);

    // 胡の提出で即確定
    w.record(2, ClaimKind::Win);
    assert_eq!(w.ready(4), Some(ClaimOffer { seat: 2, kind: ClaimKind::Win }));
}

#[test]
fn test_claim_clockwise_tiebreak() {
    // seat3の捨て牌に同種の反応が競合した場合は時計回りで近い席が勝つ
    let offers = vec![
        ClaimOffer { seat: 0, kind: ClaimKind::Win },
        ClaimOffer { seat: 2, kind: ClaimKind::Win },
    ];
    let mut w = ClaimWindow::new(Tile(TP, 1), 3, offers);
    w.record(2, ClaimKind::Win);
    assert_eq!(w.ready(4), None); // seat0(距離1)が未回答

    w.record(0, ClaimKind::Win);
    assert_eq!(w.ready(4), Some(ClaimOffer { seat: 0, kind: ClaimKind::Win }));
}

#[test]
fn test_claim_lapsed_offer() {
    // 胡が可能な席が碰を提出した場合,その席の胡の可能性は放棄される
    let offers = vec![
        ClaimOffer { seat: 1, kind: ClaimKind::Win },
        ClaimOffer { seat: 1, kind: ClaimKind::Triple },
        ClaimOffer { seat: 2, kind: ClaimKind::Triple },
    ];
    let mut w = ClaimWindow::new(Tile(TS, 9), 0, offers);
    w.record(1, ClaimKind::Triple);
    assert_eq!(w.ready(4), Some(ClaimOffer { seat: 1, kind: ClaimKind::Triple }));
}
