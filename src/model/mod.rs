// 四川麻雀(血流成河)のデータモデル
mod claim;
mod define;
mod intent;
mod meld;
mod player;
mod room;
mod settlement;
mod tile;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use claim::*;
pub use define::*;
pub use intent::*;
pub use meld::*;
pub use player::*;
pub use room::*;
pub use settlement::*;
pub use tile::*;
