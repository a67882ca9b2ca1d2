use rand::prelude::*;

use super::{clock, wall::create_wall};
use crate::hand::{calc_fan, is_winning_hand, FanContext};
use crate::model::*;
use crate::{error, info};

// 部屋単位の状態機械
// 操作(Intent)の検証と適用は不可分: 検証に失敗した操作は状態を一切変更しない
// 同一部屋への操作はRoomRegistryにより直列化される
#[derive(Debug)]
pub struct RoomController {
    room: Room,
    rng: rand::rngs::StdRng, // 牌山生成用
}

impl RoomController {
    pub fn new(rule: Rule, seed: u64) -> Self {
        assert!((2..=4).contains(&rule.seats));
        let room = Room::new(rule);
        let rng = rand::SeedableRng::seed_from_u64(seed);
        Self { room, rng }
    }

    #[inline]
    pub fn room(&self) -> &Room {
        &self.room
    }

    // 着席 満席になっても配牌はseat 0のStartNextRoundで行う
    pub fn add_player(&mut self, id: &str, name: &str) -> Result<Seat, IntentError> {
        // 同じidでの再入室は既存の席を返す
        if let Some(seat) = self.room.seat_of(id) {
            return Ok(seat);
        }
        if self.room.phase != Phase::AwaitingPlayers {
            return Err(IllegalMove::WrongPhase.into());
        }
        if self.room.players.len() >= self.room.n_seats() {
            return Err(IllegalMove::RoomFull.into());
        }
        let seat = self.room.players.len();
        self.room.players.push(Player::new(id, name, seat));
        Ok(seat)
    }

    // 状態の読み出し時に呼ぶ タイムアウトした手番の自動行動を合成する
    pub fn poll(&mut self, now: u64) -> Result<(), IntentError> {
        if self.room.aborted {
            return Err(IllegalMove::RoomAborted.into());
        }
        self.poll_inner(now)
    }

    // 操作の適用 タイムアウト処理を済ませてから本来の操作を検証する
    pub fn apply(&mut self, intent: &Intent, now: u64) -> Result<(), IntentError> {
        if self.room.aborted {
            return Err(IllegalMove::RoomAborted.into());
        }
        self.poll_inner(now)?;

        let seat = self
            .room
            .seat_of(&intent.actor)
            .ok_or(IllegalMove::UnknownPlayer)?;

        let res = match intent.ty {
            IntentType::DeclareVoidSuit => {
                let suit = intent.suit.ok_or(IllegalMove::MissingPayload)?;
                self.declare_void_suit(seat, suit, now)
            }
            IntentType::Draw => self.draw(seat, now),
            IntentType::Discard => {
                let t = intent.tile.ok_or(IllegalMove::MissingPayload)?;
                self.discard(seat, t, now)
            }
            IntentType::ClaimTriple => self.claim_from_discard(seat, ClaimKind::Triple, now),
            IntentType::ClaimQuadOpen => self.claim_from_discard(seat, ClaimKind::Quad, now),
            IntentType::ClaimQuadConcealed => {
                let t = intent.tile.ok_or(IllegalMove::MissingPayload)?;
                self.claim_quad_concealed(seat, t, now)
            }
            IntentType::ClaimQuadUpgrade => {
                let t = intent.tile.ok_or(IllegalMove::MissingPayload)?;
                self.claim_quad_upgrade(seat, t, now)
            }
            IntentType::DeclareWin => self.declare_win(seat, now),
            IntentType::StartNextRound => self.start_next_round(seat, now),
        };

        if res.is_ok() {
            self.room.step += 1;
            self.verify()?;
        }
        res
    }

    // [タイムアウト]
    // deadlineは永続化された宣言的データであり,プロセス内タイマーは使わない
    // 合成された行動は必ずdeadlineを更新するため,同じ期限に対して二重に作用しない
    fn poll_inner(&mut self, now: u64) -> Result<(), IntentError> {
        loop {
            if !clock::deadline_passed(&self.room, now) {
                return Ok(());
            }

            // 期限切れ: まず未解決の調停ウィンドウを処理
            if self.room.claims.is_some() {
                self.resolve_claims(now);
                self.room.step += 1;
                self.verify()?;
                continue;
            }

            let turn = self.room.turn;
            let pl = &self.room.players[turn];
            if pl.hand_count() % 3 == 1 {
                self.draw(turn, now)?;
            } else {
                let t = clock::auto_discard_tile(pl).ok_or_else(|| {
                    self.room.aborted = true;
                    IntentError::Corrupted("empty hand at discard timeout".to_string())
                })?;
                self.discard(turn, t, now)?;
            }
            self.room.step += 1;
            self.verify()?;
        }
    }

    // [遷移]

    fn declare_void_suit(&mut self, seat: Seat, suit: Type, now: u64) -> Result<(), IntentError> {
        if self.room.phase != Phase::VoidDeclaration {
            return Err(IllegalMove::WrongPhase.into());
        }
        if suit >= TYPE {
            return Err(IllegalMove::MissingPayload.into());
        }
        let pl = &mut self.room.players[seat];
        if pl.void_suit.is_some() {
            // 定缺は一度宣言したら局の終わりまで変更できない
            return Err(IllegalMove::AlreadyDeclared.into());
        }
        pl.void_suit = Some(suit);

        if self.room.players.iter().all(|p| p.void_suit.is_some()) {
            self.room.phase = Phase::ActivePlay;
            self.room.turn = self.room.dealer;
            self.reset_deadline(now);
            info!("all void suits declared, play begins");
        }
        Ok(())
    }

    fn draw(&mut self, seat: Seat, now: u64) -> Result<(), IntentError> {
        if self.room.phase != Phase::ActivePlay {
            return Err(IllegalMove::WrongPhase.into());
        }
        if seat != self.room.turn {
            return Err(IllegalMove::NotYourTurn.into());
        }

        // ツモは未処理の捨て牌と調停ウィンドウを破棄する
        // ただし提出済みの反応があれば先にそちらが優先的に確定する
        if self.room.claims.is_some() {
            self.resolve_claims(now);
            if self.room.phase != Phase::ActivePlay || self.room.turn != seat {
                return Err(IllegalMove::NotYourTurn.into());
            }
        }

        let pl = &self.room.players[seat];
        if pl.hand_count() % 3 != 1 {
            return Err(IllegalMove::HandParity.into());
        }

        // 牌山が尽きている場合,ツモは発生せずそのまま結算へ
        let Some(t) = self.room.wall.pop() else {
            self.settle(now);
            return Ok(());
        };
        let pl = &mut self.room.players[seat];
        inc_tile(&mut pl.hand, t);
        pl.drawn = Some(t);
        self.room.last_discard = None;
        self.reset_deadline(now);
        Ok(())
    }

    fn discard(&mut self, seat: Seat, t: Tile, now: u64) -> Result<(), IntentError> {
        if self.room.phase != Phase::ActivePlay {
            return Err(IllegalMove::WrongPhase.into());
        }
        if seat != self.room.turn {
            return Err(IllegalMove::NotYourTurn.into());
        }
        let pl = &self.room.players[seat];
        if pl.hand_count() % 3 != 2 {
            return Err(IllegalMove::HandParity.into());
        }
        if pl.count_tile(t) == 0 {
            return Err(IllegalMove::TileNotInHand.into());
        }
        // 定缺の牌が残っている間は定缺以外の牌を捨てられない
        if pl.holds_void_suit() && Some(t.0) != pl.void_suit {
            return Err(IllegalMove::VoidSuitRetained.into());
        }

        let pl = &mut self.room.players[seat];
        dec_tile(&mut pl.hand, t);
        pl.discards.push(t);
        pl.drawn = None;

        self.room.last_discard = Some(LastDiscard { tile: t, from: seat });
        let offers = self.compute_offers(t, seat);
        self.room.claims = if offers.is_empty() {
            None
        } else {
            Some(ClaimWindow::new(t, seat, offers))
        };

        // 和了済みのプレイヤーも手番は飛ばさない
        self.room.turn = (seat + 1) % self.room.n_seats();
        self.reset_deadline(now);
        Ok(())
    }

    // 捨て牌への反応 (碰・直槓) 提出された反応は調停ウィンドウに記録され,
    // より優先度の高い反応の可能性が未回答で残っている間は確定しない
    fn claim_from_discard(
        &mut self,
        seat: Seat,
        kind: ClaimKind,
        now: u64,
    ) -> Result<(), IntentError> {
        if self.room.phase != Phase::ActivePlay {
            return Err(IllegalMove::WrongPhase.into());
        }
        let n = self.room.n_seats();
        let w = self
            .room
            .claims
            .as_mut()
            .ok_or(IllegalMove::NoPendingDiscard)?;
        if !w.has_offer(seat, kind) {
            let (tile, from) = (w.tile, w.from);
            return Err(self.claim_reject_reason(seat, kind, tile, from).into());
        }
        w.record(seat, kind);
        if let Some(best) = w.ready(n) {
            self.commit_claim(best, now);
        }
        Ok(())
    }

    fn claim_reject_reason(
        &self,
        seat: Seat,
        kind: ClaimKind,
        tile: Tile,
        from: Seat,
    ) -> IllegalMove {
        if seat == from {
            return IllegalMove::NotEligible;
        }
        let pl = &self.room.players[seat];
        if pl.void_suit == Some(tile.0) {
            return IllegalMove::VoidSuitClaim;
        }
        match kind {
            ClaimKind::Triple | ClaimKind::Quad if pl.has_won => IllegalMove::AlreadyWon,
            ClaimKind::Win if pl.holds_void_suit() => IllegalMove::VoidSuitRetained,
            ClaimKind::Win => IllegalMove::NotWinningHand,
            _ => IllegalMove::NotEligible,
        }
    }

    fn claim_quad_concealed(&mut self, seat: Seat, t: Tile, now: u64) -> Result<(), IntentError> {
        if self.room.phase != Phase::ActivePlay {
            return Err(IllegalMove::WrongPhase.into());
        }
        if seat != self.room.turn {
            return Err(IllegalMove::NotYourTurn.into());
        }
        let pl = &self.room.players[seat];
        if pl.hand_count() % 3 != 2 {
            return Err(IllegalMove::HandParity.into());
        }
        // 和了済みでも暗槓は宣言できる (支払いが増えるのみで手の合法性は変わらない)
        if pl.count_tile(t) != TILE {
            return Err(IllegalMove::NotEligible.into());
        }

        let step = self.room.step;
        let pl = &mut self.room.players[seat];
        for _ in 0..TILE {
            dec_tile(&mut pl.hand, t);
        }
        pl.melds.push(Meld {
            step,
            meld_type: MeldType::Ankan,
            tiles: vec![t; TILE],
            from: None,
        });
        self.transfer_from_all(seat, 200);
        self.replacement_draw(seat, now);
        Ok(())
    }

    fn claim_quad_upgrade(&mut self, seat: Seat, t: Tile, now: u64) -> Result<(), IntentError> {
        if self.room.phase != Phase::ActivePlay {
            return Err(IllegalMove::WrongPhase.into());
        }
        if seat != self.room.turn {
            return Err(IllegalMove::NotYourTurn.into());
        }
        let pl = &self.room.players[seat];
        if pl.hand_count() % 3 != 2 {
            return Err(IllegalMove::HandParity.into());
        }
        if pl.count_tile(t) == 0 {
            return Err(IllegalMove::TileNotInHand.into());
        }
        if !pl
            .melds
            .iter()
            .any(|m| m.meld_type == MeldType::Pon && m.tile() == t)
        {
            return Err(IllegalMove::NotEligible.into());
        }

        let step = self.room.step;
        let pl = &mut self.room.players[seat];
        dec_tile(&mut pl.hand, t);
        for m in &mut pl.melds {
            if m.meld_type == MeldType::Pon && m.tile() == t {
                m.meld_type = MeldType::Kakan;
                m.tiles.push(t);
                m.step = step;
                break;
            }
        }
        self.transfer_from_all(seat, 100);
        self.replacement_draw(seat, now);
        Ok(())
    }

    fn declare_win(&mut self, seat: Seat, now: u64) -> Result<(), IntentError> {
        if self.room.phase != Phase::ActivePlay {
            return Err(IllegalMove::WrongPhase.into());
        }

        // 捨て牌への栄和は調停ウィンドウ経由
        if self.room.claims.is_some() {
            let n = self.room.n_seats();
            let turn = self.room.turn;
            let w = self.room.claims.as_mut().unwrap();
            let (tile, from) = (w.tile, w.from);
            if w.has_offer(seat, ClaimKind::Win) {
                w.record(seat, ClaimKind::Win);
                if let Some(best) = w.ready(n) {
                    self.commit_claim(best, now);
                }
                return Ok(());
            }
            if seat != turn {
                return Err(self.claim_reject_reason(seat, ClaimKind::Win, tile, from).into());
            }
        }

        // 自摸和了
        self.self_win(seat, now)
    }

    fn self_win(&mut self, seat: Seat, now: u64) -> Result<(), IntentError> {
        if seat != self.room.turn {
            return Err(IllegalMove::NotYourTurn.into());
        }
        let pl = &self.room.players[seat];
        if pl.hand_count() % 3 != 2 {
            return Err(IllegalMove::HandParity.into());
        }
        if pl.holds_void_suit() {
            return Err(IllegalMove::VoidSuitRetained.into());
        }
        if !is_winning_hand(&pl.hand, !pl.melds.is_empty()) {
            return Err(IllegalMove::NotWinningHand.into());
        }

        let hand = pl.hand;
        let melds = pl.melds.clone();
        // 直前に獲得した牌を和了牌として記録 (配牌14枚目の天和を含め常に存在する)
        let wt = pl.drawn.unwrap_or_else(|| tiles_from_tile_table(&hand)[0]);
        let fan = calc_fan(&hand, &melds, wt, true, self.room.rule.base_stake);
        self.book_win(seat, fan, tiles_from_tile_table(&hand), wt, true);

        // 血流: 和了しても局は続く 牌山が尽きている場合のみ結算
        if self.room.wall.is_empty() {
            self.settle(now);
        } else {
            // 手番は和了者のまま 打牌して初めて次へ回る
            self.reset_deadline(now);
        }
        Ok(())
    }

    fn start_next_round(&mut self, seat: Seat, now: u64) -> Result<(), IntentError> {
        if seat != 0 {
            return Err(IllegalMove::NotHost.into());
        }
        match self.room.phase {
            Phase::AwaitingPlayers => {
                if self.room.players.len() != self.room.n_seats() {
                    return Err(IllegalMove::SeatsNotFilled.into());
                }
            }
            Phase::Settlement => {}
            _ => return Err(IllegalMove::WrongPhase.into()),
        }
        self.deal_round(now);
        Ok(())
    }

    // [内部処理]

    // 配牌 全員13枚,親(seat 0)は14枚目を受け取る
    fn deal_round(&mut self, _now: u64) {
        let seed = self.rng.next_u64();
        let mut wall = create_wall(seed, &self.room.rule);
        self.room.deck_count = wall.len();

        for pl in &mut self.room.players {
            pl.reset_for_round();
            // 10枚抜きでも配牌に必要な枚数は常に残る
            for _ in 0..13 {
                let t = wall.pop().expect("wall exhausted at deal");
                inc_tile(&mut pl.hand, t);
            }
        }
        let dealer = self.room.dealer;
        let t14 = wall.pop().expect("wall exhausted at deal");
        let pl = &mut self.room.players[dealer];
        inc_tile(&mut pl.hand, t14);
        pl.drawn = Some(t14);

        self.room.wall = wall;
        self.room.phase = Phase::VoidDeclaration;
        self.room.turn = dealer;
        self.room.last_discard = None;
        self.room.claims = None;
        self.room.settlement = None;
        self.room.turn_deadline = None; // 定缺宣言フェーズに手番の期限はない
        info!(
            "round dealt: {} players, wall {}",
            self.room.players.len(),
            self.room.wall.len()
        );
    }

    // 捨て牌に対する全席の反応可能性を列挙
    fn compute_offers(&self, t: Tile, from: Seat) -> Vec<ClaimOffer> {
        let mut offers = vec![];
        for seat in 0..self.room.n_seats() {
            if seat == from {
                continue;
            }
            let pl = &self.room.players[seat];
            if pl.void_suit == Some(t.0) {
                continue; // 定缺の花色には一切反応できない
            }

            // 栄和: 定缺の牌を持たず,捨て牌を加えて和了形
            if !pl.holds_void_suit() && pl.hand_count() % 3 == 1 {
                let mut h = pl.hand;
                inc_tile(&mut h, t);
                if is_winning_hand(&h, !pl.melds.is_empty()) {
                    offers.push(ClaimOffer {
                        seat,
                        kind: ClaimKind::Win,
                    });
                }
            }

            // 碰・直槓は和了済みのプレイヤーには許可しない
            if !pl.has_won {
                let c = pl.count_tile(t);
                if c == 3 {
                    offers.push(ClaimOffer {
                        seat,
                        kind: ClaimKind::Quad,
                    });
                }
                if c >= 2 {
                    offers.push(ClaimOffer {
                        seat,
                        kind: ClaimKind::Triple,
                    });
                }
            }
        }
        offers
    }

    // 調停ウィンドウの解決 記録済みの最良反応を確定し,なければ捨て牌ごと破棄
    fn resolve_claims(&mut self, now: u64) {
        if let Some(w) = &self.room.claims {
            if let Some(best) = w.best_recorded(self.room.n_seats()) {
                self.commit_claim(best, now);
                return;
            }
        }
        self.room.claims = None;
        self.room.last_discard = None;
    }

    // 反応の確定 資格は捨て牌の時点で検証済みであり,ウィンドウが開いている間に
    // 状態を変える遷移は存在しない
    fn commit_claim(&mut self, offer: ClaimOffer, now: u64) {
        let Some(w) = self.room.claims.take() else {
            return;
        };
        self.room.last_discard = None;
        match offer.kind {
            ClaimKind::Triple => self.commit_triple(offer.seat, &w, now),
            ClaimKind::Quad => self.commit_quad_open(offer.seat, &w, now),
            ClaimKind::Win => self.commit_win_on_discard(offer.seat, &w, now),
        }
    }

    fn commit_triple(&mut self, seat: Seat, w: &ClaimWindow, now: u64) {
        let t = w.tile;
        // 捨て牌は複製ではなく移動 放銃者の河から取り除く
        self.room.players[w.from].discards.pop();

        let step = self.room.step;
        let pl = &mut self.room.players[seat];
        dec_tile(&mut pl.hand, t);
        dec_tile(&mut pl.hand, t);
        pl.melds.push(Meld {
            step,
            meld_type: MeldType::Pon,
            tiles: vec![t; 3],
            from: Some(w.from),
        });
        pl.drawn = Some(t); // 直近に獲得した牌として記録 (タイムアウト打牌の基準)

        self.room.turn = seat;
        self.reset_deadline(now);
    }

    fn commit_quad_open(&mut self, seat: Seat, w: &ClaimWindow, now: u64) {
        let t = w.tile;
        self.room.players[w.from].discards.pop();

        let step = self.room.step;
        let pl = &mut self.room.players[seat];
        for _ in 0..3 {
            dec_tile(&mut pl.hand, t);
        }
        pl.melds.push(Meld {
            step,
            meld_type: MeldType::Minkan,
            tiles: vec![t; TILE],
            from: Some(w.from),
        });

        // 直槓の支払いは放銃者のみ
        self.transfer(w.from, seat, 200);
        self.room.turn = seat;
        self.replacement_draw(seat, now);
    }

    fn commit_win_on_discard(&mut self, seat: Seat, w: &ClaimWindow, now: u64) {
        let pl = &self.room.players[seat];
        let mut hand = pl.hand;
        inc_tile(&mut hand, w.tile); // 和了牌は河に残したまま手の判定にのみ加える
        let melds = pl.melds.clone();
        let fan = calc_fan(&hand, &melds, w.tile, false, self.room.rule.base_stake);
        self.book_win(seat, fan, tiles_from_tile_table(&hand), w.tile, false);
        // 栄和では手番は移動しない (捨て牌の時点で既に次へ回っている)
        self.reset_deadline(now);
    }

    // 和了の記帳 支払いは全員から,スナップショットは初回のみ凍結
    fn book_win(&mut self, seat: Seat, fan: FanContext, tiles: Vec<Tile>, wt: Tile, is_drawn: bool) {
        let payout = fan.payout;
        let n_opp = (self.room.n_seats() - 1) as Score;
        self.transfer_from_all(seat, payout);

        let pl = &mut self.room.players[seat];
        pl.has_won = true;
        pl.win_count += 1;
        pl.win_delta += payout * n_opp;
        info!(
            "seat {} won ({}): {} fan, payout {}",
            seat,
            if is_drawn { "self-draw" } else { "discard" },
            fan.fan,
            payout
        );
        if pl.first_win.is_none() {
            pl.first_win = Some(WinRecord {
                tiles,
                winning_tile: wt,
                fan,
                is_drawn,
            });
        }
    }

    // 槓の後の嶺上ツモ 牌山が尽きていれば結算へ
    fn replacement_draw(&mut self, seat: Seat, now: u64) {
        let Some(t) = self.room.wall.pop() else {
            self.settle(now);
            return;
        };
        let pl = &mut self.room.players[seat];
        inc_tile(&mut pl.hand, t);
        pl.drawn = Some(t);
        self.room.last_discard = None;
        self.reset_deadline(now);
    }

    fn settle(&mut self, now: u64) {
        let mut winners = vec![];
        for pl in &self.room.players {
            if !pl.has_won {
                continue;
            }
            let Some(rec) = &pl.first_win else {
                continue; // has_wonとfirst_winは常に対で更新される
            };
            winners.push(WinnerSummary {
                player_id: pl.id.clone(),
                name: pl.name.clone(),
                hand: rec.tiles.clone(),
                fans: rec.fan.fans.clone(),
                payout_delta: pl.win_delta,
                is_drawn: rec.is_drawn,
            });
        }
        info!("round settled: {} winner(s)", winners.len());
        self.room.settlement = Some(Settlement {
            winners,
            timestamp: now,
        });
        self.room.phase = Phase::Settlement;
        self.room.turn_deadline = None;
        self.room.last_discard = None;
        self.room.claims = None;
    }

    fn transfer(&mut self, from: Seat, to: Seat, amount: Score) {
        self.room.players[from].score -= amount;
        self.room.players[to].score += amount;
    }

    fn transfer_from_all(&mut self, to: Seat, amount: Score) {
        for s in 0..self.room.n_seats() {
            if s != to {
                self.transfer(s, to, amount);
            }
        }
    }

    #[inline]
    fn reset_deadline(&mut self, now: u64) {
        self.room.turn_deadline = Some(now + self.room.rule.timeout_ms);
    }

    // 牌の保存則の検査 破壊を検出したら部屋ごと放棄する
    fn verify(&mut self) -> Result<(), IntentError> {
        if self.room.deck_count == 0 {
            return Ok(()); // 配牌前
        }
        let mut all = tiles_to_tile_table(&self.room.wall);
        for pl in &self.room.players {
            for ti in 0..TYPE {
                for ni in 1..TNUM {
                    all[ti][ni] += pl.hand[ti][ni];
                }
            }
            for m in &pl.melds {
                for &t in &m.tiles {
                    inc_tile(&mut all, t);
                }
            }
            for &t in &pl.discards {
                inc_tile(&mut all, t);
            }
        }

        let total = count_all(&all);
        if total != self.room.deck_count {
            return self.corrupt(format!(
                "tile count mismatch: {} != {}",
                total, self.room.deck_count
            ));
        }
        for ti in 0..TYPE {
            for ni in 1..TNUM {
                if all[ti][ni] > TILE {
                    return self.corrupt(format!("duplicated tile: {}", Tile(ti, ni)));
                }
            }
        }
        Ok(())
    }

    fn corrupt(&mut self, msg: String) -> Result<(), IntentError> {
        error!("room aborted: {}", msg);
        self.room.aborted = true;
        Err(IntentError::Corrupted(msg))
    }
}

// [テスト用ヘルパ]

// 手牌と牌山を直接指定した対局中の部屋を構成する (ツモは牌山文字列の末尾から)
#[cfg(test)]
fn craft(hands: &[&str], wall: &str) -> RoomController {
    let mut c = test_room(hands.len());
    for (seat, h) in hands.iter().enumerate() {
        c.room.players[seat].hand = tiles_to_tile_table(&tiles_from_string(h).unwrap());
    }
    c.room.wall = tiles_from_string(wall).unwrap();
    c.room.phase = Phase::ActivePlay;
    c.room.turn = 0;
    recount(&mut c);
    c
}

#[cfg(test)]
fn test_room(n: usize) -> RoomController {
    let rule = Rule {
        seats: n,
        ..Rule::default()
    };
    let mut c = RoomController::new(rule, 1);
    for i in 0..n {
        c.add_player(&format!("p{}", i), &format!("player{}", i))
            .unwrap();
    }
    c
}

// 副露・河を後から追加した場合に呼ぶ
#[cfg(test)]
fn recount(c: &mut RoomController) {
    let mut total = c.room.wall.len();
    for pl in &c.room.players {
        total += pl.hand_count() + pl.discards.len();
        total += pl.melds.iter().map(|m| m.tiles.len()).sum::<usize>();
    }
    c.room.deck_count = total;
}

#[test]
fn test_start_requires_full_seats() {
    let mut c = RoomController::new(Rule::default(), 1);
    c.add_player("p0", "host").unwrap();
    assert_eq!(
        c.apply(&Intent::start_next_round("p0"), 0),
        Err(IllegalMove::SeatsNotFilled.into())
    );
    c.add_player("p1", "b").unwrap();
    c.add_player("p2", "c").unwrap();
    c.add_player("p3", "d").unwrap();
    assert_eq!(
        c.add_player("p4", "e"),
        Err(IllegalMove::RoomFull.into())
    );
    // 次局開始はseat 0のみ
    assert_eq!(
        c.apply(&Intent::start_next_round("p1"), 0),
        Err(IllegalMove::NotHost.into())
    );
    c.apply(&Intent::start_next_round("p0"), 0).unwrap();
    assert_eq!(c.room.phase, Phase::VoidDeclaration);
}

#[test]
fn test_round_start_and_void_declaration() {
    let mut c = test_room(4);
    assert_eq!(c.room.phase, Phase::AwaitingPlayers);
    c.apply(&Intent::start_next_round("p0"), 1000).unwrap();

    // 親は14枚,他は13枚
    assert_eq!(c.room.phase, Phase::VoidDeclaration);
    assert_eq!(c.room.players[0].hand_count(), 14);
    assert!(c.room.players[0].drawn.is_some());
    for s in 1..4 {
        assert_eq!(c.room.players[s].hand_count(), 13);
    }
    assert_eq!(c.room.wall.len(), DECK - 53);
    assert_eq!(c.room.deck_count, DECK);

    // 定缺宣言が揃うまで打牌はできない
    assert_eq!(
        c.apply(&Intent::discard("p0", Tile(TM, 1)), 1500),
        Err(IllegalMove::WrongPhase.into())
    );
    assert_eq!(
        c.apply(&Intent::draw("nosuch"), 1500),
        Err(IllegalMove::UnknownPlayer.into())
    );

    c.apply(&Intent::declare_void_suit("p0", TM), 2000).unwrap();
    assert_eq!(
        c.apply(&Intent::declare_void_suit("p0", TP), 2000),
        Err(IllegalMove::AlreadyDeclared.into())
    );
    c.apply(&Intent::declare_void_suit("p1", TP), 2000).unwrap();
    c.apply(&Intent::declare_void_suit("p2", TS), 2000).unwrap();
    assert_eq!(c.room.phase, Phase::VoidDeclaration);
    c.apply(&Intent::declare_void_suit("p3", TM), 2000).unwrap();

    // 全員の宣言で対局開始 手番は親,期限は15秒後
    assert_eq!(c.room.phase, Phase::ActivePlay);
    assert_eq!(c.room.turn, 0);
    assert_eq!(c.room.turn_deadline, Some(2000 + 15000));

    // ツモの枚数条件
    assert_eq!(
        c.apply(&Intent::draw("p0"), 2500),
        Err(IllegalMove::HandParity.into())
    );
    assert_eq!(
        c.apply(&Intent::draw("p1"), 2500),
        Err(IllegalMove::NotYourTurn.into())
    );
}

#[test]
fn test_void_suit_discard_enforcement() {
    let mut c = craft(&["m19p123p456p789s123", "p111p222s456s6789"], "s555");
    c.room.players[0].void_suit = Some(TM);
    c.room.players[1].void_suit = Some(TM);

    // 定缺の牌を残したまま他の牌は捨てられない
    assert_eq!(
        c.apply(&Intent::discard("p0", Tile(TS, 1)), 1000),
        Err(IllegalMove::VoidSuitRetained.into())
    );
    // 定缺の牌が残っている間は和了宣言もできない
    assert_eq!(
        c.apply(&Intent::declare_win("p0"), 1000),
        Err(IllegalMove::VoidSuitRetained.into())
    );
    assert_eq!(
        c.apply(&Intent::discard("p0", Tile(TP, 9)), 1000),
        Err(IllegalMove::VoidSuitRetained.into())
    );
    c.apply(&Intent::discard("p0", Tile(TM, 9)), 1000).unwrap();
    assert_eq!(c.room.players[0].discards, vec![Tile(TM, 9)]);
    assert_eq!(c.room.turn, 1);

    // 捨て牌は定缺(m)のため誰も反応できない
    assert!(c.room.claims.is_none());
    assert!(c.room.last_discard.is_some());
    c.apply(&Intent::draw("p1"), 2000).unwrap();
    assert!(c.room.last_discard.is_none());
    assert_eq!(c.room.players[1].drawn, Some(Tile(TS, 5)));

    // 持っていない牌は捨てられない
    assert_eq!(
        c.apply(&Intent::discard("p1", Tile(TM, 1)), 3000),
        Err(IllegalMove::TileNotInHand.into())
    );
}

#[test]
fn test_claim_priority_win_over_triple() {
    // p0の捨てるm5に対してp1は碰,p2は栄和が可能
    let mut c = craft(
        &[
            "m5p234p567p888s567s2",
            "m55s111s222s333s49",
            "m111m333m5p444s678",
            "p123p5p678p99m22s55",
        ],
        "s999p77",
    );
    c.apply(&Intent::discard("p0", Tile(TM, 5)), 1000).unwrap();
    let w = c.room.claims.as_ref().unwrap();
    assert!(w.has_offer(1, ClaimKind::Triple));
    assert!(w.has_offer(2, ClaimKind::Win));
    assert!(!w.has_offer(3, ClaimKind::Triple));
    assert_eq!(c.room.turn, 1);

    // 碰を先に提出しても,胡の可能性が未回答のうちは確定しない
    c.apply(&Intent::claim_triple("p1"), 1100).unwrap();
    assert!(c.room.players[1].melds.is_empty());
    assert!(c.room.claims.is_some());

    // 資格のない反応は記録すらされない
    assert_eq!(
        c.apply(&Intent::claim_triple("p3"), 1150),
        Err(IllegalMove::NotEligible.into())
    );

    // 胡の提出で胡が確定し,碰は適用されない
    c.apply(&Intent::declare_win("p2"), 1200).unwrap();
    assert!(c.room.players[2].has_won);
    assert_eq!(c.room.players[2].win_count, 1);
    assert!(c.room.players[1].melds.is_empty());
    assert!(c.room.claims.is_none());
    assert!(c.room.last_discard.is_none());

    // 0翻 → 基本点100を全員から受け取る
    assert_eq!(c.room.players[2].score, 300);
    assert_eq!(c.room.players[2].win_delta, 300);
    assert_eq!(c.room.players[0].score, -100);
    assert_eq!(c.room.players[1].score, -100);

    // 栄和でも捨て牌は河に残る
    assert_eq!(c.room.players[0].discards, vec![Tile(TM, 5)]);
    let rec = c.room.players[2].first_win.as_ref().unwrap();
    assert!(!rec.is_drawn);
    assert_eq!(rec.winning_tile, Tile(TM, 5));
    assert_eq!(rec.tiles.len(), 14);

    // 血流: 局は続き,手番は捨て牌の次の席のまま
    assert_eq!(c.room.phase, Phase::ActivePlay);
    assert_eq!(c.room.turn, 1);
    c.apply(&Intent::draw("p1"), 1300).unwrap();
}

#[test]
fn test_self_draw_win_then_exhaustion_settlement() {
    let mut c = craft(&["m111m333m55m99", "p123p456p789s123s4"], "s5m9");
    c.room.players[0].melds.push(Meld {
        step: 0,
        meld_type: MeldType::Ankan,
        tiles: vec![Tile(TM, 2); TILE],
        from: None,
    });
    recount(&mut c);

    c.apply(&Intent::draw("p0"), 1000).unwrap();
    assert_eq!(c.room.players[0].drawn, Some(Tile(TM, 9)));
    assert_eq!(
        c.apply(&Intent::declare_win("p1"), 1500),
        Err(IllegalMove::NotYourTurn.into())
    );

    // 清一色2 + 対対和1 + 根1 + 自摸1 = 5翻
    c.apply(&Intent::declare_win("p0"), 2000).unwrap();
    let p0 = &c.room.players[0];
    assert!(p0.has_won);
    let rec = p0.first_win.as_ref().unwrap();
    assert!(rec.is_drawn);
    assert_eq!(rec.winning_tile, Tile(TM, 9));
    assert_eq!(rec.tiles.len(), 11);
    assert_eq!(rec.fan.fan, 5);
    assert_eq!(rec.fan.payout, 3200);
    assert_eq!(p0.score, 3200);
    assert_eq!(c.room.players[1].score, -3200);

    // 血流: 牌山が残っていれば局は続き,和了者がそのまま打牌する
    assert_eq!(c.room.phase, Phase::ActivePlay);
    assert_eq!(c.room.turn, 0);
    c.apply(&Intent::discard("p0", Tile(TM, 9)), 3000).unwrap();
    assert_eq!(c.room.turn, 1);

    // 最後のツモと打牌
    c.apply(&Intent::draw("p1"), 4000).unwrap();
    assert!(c.room.wall.is_empty());
    c.apply(&Intent::discard("p1", Tile(TS, 4)), 5000).unwrap();

    // 牌山が尽きた後のツモは発生せず,そのまま結算へ
    c.apply(&Intent::draw("p0"), 6000).unwrap();
    assert_eq!(c.room.phase, Phase::Settlement);
    let st = c.room.settlement.as_ref().unwrap();
    assert_eq!(st.timestamp, 6000);
    assert_eq!(st.winners.len(), 1);
    assert_eq!(st.winners[0].player_id, "p0");
    assert_eq!(st.winners[0].payout_delta, 3200);
    assert!(st.winners[0].is_drawn);
    assert!(c.room.turn_deadline.is_none());

    // 結算後の対局操作はフェーズ違反
    assert_eq!(
        c.apply(&Intent::draw("p1"), 7000),
        Err(IllegalMove::WrongPhase.into())
    );

    // seat 0が次局を開始 持ち点は引き継ぎ,局の状態はリセット
    c.apply(&Intent::start_next_round("p0"), 8000).unwrap();
    assert_eq!(c.room.phase, Phase::VoidDeclaration);
    assert_eq!(c.room.players[0].score, 3200);
    assert!(!c.room.players[0].has_won);
    assert!(c.room.players[0].first_win.is_none());
    assert_eq!(c.room.players[0].hand_count(), 14);
    assert_eq!(c.room.players[1].hand_count(), 13);
}

#[test]
fn test_second_win_accumulates() {
    // 血流の本領: 同じプレイヤーが1局で2回和了する
    // m78m99の両面待ち (m6/m9) で自摸 → 和了牌を捨てて同じ待ちに戻り再度自摸
    let mut c = craft(&["m123m456m78m99", "p123p456p789s1122"], "m6s3m9");

    c.apply(&Intent::draw("p0"), 1000).unwrap();
    c.apply(&Intent::declare_win("p0"), 1100).unwrap();
    // 清一色2 + 自摸1 = 3翻 → 800
    assert_eq!(c.room.players[0].win_count, 1);
    assert_eq!(c.room.players[0].score, 800);

    c.apply(&Intent::discard("p0", Tile(TM, 9)), 1200).unwrap();
    c.apply(&Intent::draw("p1"), 1300).unwrap();
    c.apply(&Intent::discard("p1", Tile(TS, 3)), 1400).unwrap();

    // 2回目の和了は別の待ち牌 (m6) 牌山はこのツモで尽きる
    c.apply(&Intent::draw("p0"), 1500).unwrap();
    assert!(c.room.wall.is_empty());
    c.apply(&Intent::declare_win("p0"), 1600).unwrap();

    let p0 = &c.room.players[0];
    assert!(p0.has_won);
    assert_eq!(p0.win_count, 2);
    // 支払いは和了ごとに発生し,win_deltaに累積する
    assert_eq!(p0.score, 1600);
    assert_eq!(p0.win_delta, 1600);
    assert_eq!(c.room.players[1].score, -1600);

    // スナップショットは初回和了のまま凍結 (2回目のm6では上書きされない)
    let rec = p0.first_win.as_ref().unwrap();
    assert_eq!(rec.winning_tile, Tile(TM, 9));
    assert_eq!(rec.fan.payout, 800);

    // 牌山が尽きているため2回目の和了で即結算 payout_deltaは累計
    assert_eq!(c.room.phase, Phase::Settlement);
    let st = c.room.settlement.as_ref().unwrap();
    assert_eq!(st.winners.len(), 1);
    assert_eq!(st.winners[0].payout_delta, 1600);
    assert!(st.winners[0].is_drawn);
}

#[test]
fn test_claim_quad_open() {
    let mut c = craft(
        &["m5p123p456p789s1234", "m555m12m7p99s567s89"],
        "p11m88",
    );
    c.apply(&Intent::discard("p0", Tile(TM, 5)), 1000).unwrap();
    let w = c.room.claims.as_ref().unwrap();
    assert!(w.has_offer(1, ClaimKind::Quad));
    assert!(w.has_offer(1, ClaimKind::Triple));

    // 他に優先する反応可能性がないため即確定
    c.apply(&Intent::claim_quad_open("p1"), 1100).unwrap();
    let p1 = &c.room.players[1];
    assert_eq!(p1.melds.len(), 1);
    assert_eq!(p1.melds[0].meld_type, MeldType::Minkan);
    assert_eq!(p1.melds[0].from, Some(0));
    assert_eq!(p1.melds[0].tiles, vec![Tile(TM, 5); TILE]);

    // 直槓の即時支払いは放銃者からのみ200
    assert_eq!(p1.score, 200);
    assert_eq!(c.room.players[0].score, -200);

    // 捨て牌は河から移動し,嶺上ツモで手番が続く
    assert!(c.room.players[0].discards.is_empty());
    assert_eq!(p1.drawn, Some(Tile(TM, 8)));
    assert_eq!(p1.hand_count(), 11);
    assert_eq!(c.room.turn, 1);
    assert_eq!(c.room.turn_deadline, Some(1100 + 15000));
}

#[test]
fn test_claim_triple_then_discard() {
    let mut c = craft(
        &["s9m123m456m99p11p234", "s99p567p888s11s24p4"],
        "m78",
    );
    c.apply(&Intent::discard("p0", Tile(TS, 9)), 1000).unwrap();
    c.apply(&Intent::claim_triple("p1"), 1100).unwrap();

    let p1 = &c.room.players[1];
    assert_eq!(p1.melds[0].meld_type, MeldType::Pon);
    assert_eq!(p1.melds[0].tiles, vec![Tile(TS, 9); 3]);
    assert_eq!(p1.melds[0].from, Some(0));
    assert_eq!(p1.hand_count(), 11);
    assert!(c.room.players[0].discards.is_empty());
    assert_eq!(c.room.turn, 1);

    // 碰の後はツモなしでそのまま打牌
    assert_eq!(
        c.apply(&Intent::draw("p1"), 1200),
        Err(IllegalMove::HandParity.into())
    );
    c.apply(&Intent::discard("p1", Tile(TP, 4)), 1300).unwrap();
    assert_eq!(c.room.turn, 0);
}

#[test]
fn test_claim_quad_concealed_and_upgrade() {
    let mut c = craft(
        &["m1111p234p567s2s99m6", "m567m888p88s345s67"],
        "s55m3",
    );
    // 和了済みでも槓は宣言できる
    c.room.players[0].has_won = true;

    assert_eq!(
        c.apply(&Intent::claim_quad_concealed("p0", Tile(TS, 2)), 900),
        Err(IllegalMove::NotEligible.into())
    );
    c.apply(&Intent::claim_quad_concealed("p0", Tile(TM, 1)), 1000)
        .unwrap();
    let p0 = &c.room.players[0];
    assert_eq!(p0.melds[0].meld_type, MeldType::Ankan);
    assert_eq!(p0.melds[0].from, None);
    // 暗槓は全員から200
    assert_eq!(p0.score, 200);
    assert_eq!(c.room.players[1].score, -200);
    assert_eq!(p0.drawn, Some(Tile(TM, 3)));
    assert_eq!(p0.hand_count(), 11);
    assert_eq!(c.room.turn, 0);

    // 加槓: 碰の明刻に手牌の1枚を追加して全員から100
    c.room.players[0].melds.push(Meld {
        step: 0,
        meld_type: MeldType::Pon,
        tiles: vec![Tile(TS, 2); 3],
        from: Some(1),
    });
    recount(&mut c);
    c.apply(&Intent::claim_quad_upgrade("p0", Tile(TS, 2)), 2000)
        .unwrap();
    let p0 = &c.room.players[0];
    let kakan = p0
        .melds
        .iter()
        .find(|m| m.meld_type == MeldType::Kakan)
        .unwrap();
    assert_eq!(kakan.tiles.len(), TILE);
    assert_eq!(p0.score, 200 + 100);
    assert_eq!(c.room.players[1].score, -300);
    assert_eq!(p0.drawn, Some(Tile(TS, 5)));
    assert_eq!(p0.hand_count(), 11);
}

#[test]
fn test_draw_discards_unanswered_window() {
    let mut c = craft(
        &["s9m123m456m99p11p234", "s99p567p888s11s24p4"],
        "m78",
    );
    c.apply(&Intent::discard("p0", Tile(TS, 9)), 1000).unwrap();
    assert!(c.room.claims.is_some());

    // 反応せずにツモれば窓は捨て牌ごと破棄される
    c.apply(&Intent::draw("p1"), 2000).unwrap();
    assert!(c.room.claims.is_none());
    assert!(c.room.last_discard.is_none());
    assert_eq!(c.room.players[1].hand_count(), 14);
    assert_eq!(c.room.players[0].discards, vec![Tile(TS, 9)]);

    // 窓が閉じた後の反応は拒否
    assert_eq!(
        c.apply(&Intent::claim_triple("p1"), 2100),
        Err(IllegalMove::NoPendingDiscard.into())
    );
}

#[test]
fn test_timeout_auto_play() {
    let mut c = craft(
        &["m37p123p456p789s123", "m111m222s456s789m9"],
        "s99p22",
    );
    c.room.players[0].void_suit = Some(TM);
    c.room.players[1].void_suit = Some(TS);
    c.room.turn_deadline = Some(1000);

    // 期限切れ → 定缺の最小牌を自動打牌
    c.poll(20000).unwrap();
    assert_eq!(c.room.players[0].discards, vec![Tile(TM, 3)]);
    assert_eq!(c.room.turn, 1);
    assert_eq!(c.room.turn_deadline, Some(20000 + 15000));

    // 同じ時刻での再読み出しは何も変えない (冪等)
    let step = c.room.step;
    c.poll(20000).unwrap();
    assert_eq!(c.room.step, step);
    assert_eq!(c.room.players[0].discards.len(), 1);

    // 次の期限切れでは手番のツモが合成される
    c.poll(50001).unwrap();
    assert_eq!(c.room.players[1].drawn, Some(Tile(TP, 2)));
    assert_eq!(c.room.turn_deadline, Some(50001 + 15000));

    // さらに期限が切れれば打牌 (定缺sの最小牌)
    c.poll(80000).unwrap();
    assert_eq!(c.room.players[1].discards, vec![Tile(TS, 4)]);
    assert_eq!(c.room.turn, 0);
}

#[test]
fn test_timeout_resolves_recorded_claim() {
    let mut c = craft(
        &[
            "m5p234p567p888s567s2",
            "m55s111s222s333s49",
            "m111m333m5p444s678",
            "p123p5p678p99m22s55",
        ],
        "s999p77",
    );
    c.apply(&Intent::discard("p0", Tile(TM, 5)), 1000).unwrap();
    c.apply(&Intent::claim_triple("p1"), 1100).unwrap();
    assert!(c.room.players[1].melds.is_empty());

    // 期限までに胡が提出されなければ記録済みの碰が確定する
    c.poll(16001).unwrap();
    let p1 = &c.room.players[1];
    assert_eq!(p1.melds.len(), 1);
    assert_eq!(p1.melds[0].meld_type, MeldType::Pon);
    assert!(c.room.players[0].discards.is_empty());
    assert!(!c.room.players[2].has_won);
    assert_eq!(c.room.turn, 1);
    assert_eq!(c.room.turn_deadline, Some(16001 + 15000));
}

#[test]
fn test_invariant_violation_aborts_room() {
    let mut c = craft(
        &["m123m456m789p123s56", "p456p789s123s789m1"],
        "m88",
    );
    // 手牌を外部から破壊して保存則を破る
    inc_tile(&mut c.room.players[1].hand, Tile(TP, 9));

    let res = c.apply(&Intent::discard("p0", Tile(TS, 5)), 1000);
    assert!(matches!(res, Err(IntentError::Corrupted(_))));
    assert!(c.room.aborted);

    // 破壊された部屋への操作は全て拒否
    assert_eq!(
        c.apply(&Intent::draw("p1"), 2000),
        Err(IllegalMove::RoomAborted.into())
    );
    assert_eq!(
        c.poll(3000),
        Err(IllegalMove::RoomAborted.into())
    );
}
