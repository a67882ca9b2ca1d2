use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::prelude::*;

use super::room_controller::RoomController;
use crate::model::*;
use crate::util::misc::now_ms;

// 部屋の台帳 部屋ごとにMutexを持ち,同一部屋への操作を直列化する
// 部屋間は完全に独立で,ある部屋のロックが他の部屋をブロックすることはない
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Mutex<RoomController>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&self, room_id: &str, rule: Rule) -> Arc<Mutex<RoomController>> {
        let seed = thread_rng().gen();
        let ctrl = Arc::new(Mutex::new(RoomController::new(rule, seed)));
        self.rooms
            .lock()
            .unwrap()
            .insert(room_id.to_string(), ctrl.clone());
        ctrl
    }

    pub fn room(&self, room_id: &str) -> Option<Arc<Mutex<RoomController>>> {
        self.rooms.lock().unwrap().get(room_id).cloned()
    }

    pub fn remove_room(&self, room_id: &str) -> bool {
        self.rooms.lock().unwrap().remove(room_id).is_some()
    }

    pub fn apply(&self, room_id: &str, intent: &Intent, now: u64) -> Result<(), IntentError> {
        let ctrl = self.room(room_id).ok_or(IllegalMove::UnknownRoom)?;
        let mut ctrl = ctrl.lock().unwrap();
        ctrl.apply(intent, now)
    }

    // 実時間で適用する入口 エンジン本体とテストは時刻を明示して渡す
    pub fn apply_now(&self, room_id: &str, intent: &Intent) -> Result<(), IntentError> {
        self.apply(room_id, intent, now_ms())
    }
}

#[test]
fn test_registry_rooms_are_independent() {
    let reg = RoomRegistry::new();
    reg.create_room("r0", Rule::default());
    reg.create_room("r1", Rule { seats: 2, ..Rule::default() });

    {
        let r0 = reg.room("r0").unwrap();
        let mut r0 = r0.lock().unwrap();
        r0.add_player("a", "a").unwrap();
        // r0のロックを保持したままr1を操作できる
        let r1 = reg.room("r1").unwrap();
        let mut r1 = r1.lock().unwrap();
        r1.add_player("a", "a").unwrap();
    }

    assert_eq!(reg.room("r0").unwrap().lock().unwrap().room().players.len(), 1);
    assert!(reg.room("nosuch").is_none());
    assert_eq!(
        reg.apply("nosuch", &Intent::draw("a"), 0),
        Err(IntentError::Illegal(IllegalMove::UnknownRoom))
    );
    assert_eq!(
        reg.apply_now("nosuch", &Intent::draw("a")),
        Err(IntentError::Illegal(IllegalMove::UnknownRoom))
    );
    // 実時間入口も同じ検証を通る (席が揃っていないため開始できない)
    assert_eq!(
        reg.apply_now("r0", &Intent::start_next_round("a")),
        Err(IntentError::Illegal(IllegalMove::SeatsNotFilled))
    );

    assert!(reg.remove_room("r1"));
    assert!(!reg.remove_room("r1"));
}
