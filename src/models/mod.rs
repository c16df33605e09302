// 基本的なデータ型と数学ユーティリティ
pub mod common;

// シミュレータセッションのインターフェース（trait）定義
pub mod traits;

// 機体モデルの実装
pub mod vehicle;

// 便利な re-export
pub use common::*;
pub use traits::ISession;
pub use vehicle::{VehicleModel, VehicleState};
