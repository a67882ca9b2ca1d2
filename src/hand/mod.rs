// 和了判定と翻数計算
pub mod fan;
pub mod win;

pub use fan::*;
pub use win::*;
