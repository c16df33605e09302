use crate::models::common::ControlCommand;
use crate::models::vehicle::VehicleState;
use crate::simulator::SimulationError;

/// シミュレータセッションの基本インターフェース
///
/// 試験コントローラはこのトレイト経由でのみ物理シミュレータに触れます。
/// 1試験につき1セッションを開き、試験終了時に必ずcloseします。
pub trait ISession {
    /// 操縦コマンドを与えて物理状態を1ティック進める
    ///
    /// # 引数
    ///
    /// * `command` - このティックの操縦コマンド
    ///
    /// # 戻り値
    ///
    /// 不正なコマンドやセッション異常の場合はエラー
    fn step(&mut self, command: &ControlCommand) -> Result<(), SimulationError>;

    /// 機体の現在の運動状態を読み取る
    fn current_state(&self) -> VehicleState;

    /// セッション固有の時間刻み[s]を取得
    fn tick_period(&self) -> f64;

    /// セッションを終了してリソースを解放
    ///
    /// 早期完了（完了条件成立）の経路を含め、1セッションにつき
    /// ちょうど1回呼び出します。2回目以降の呼び出しは無視されます。
    fn close(&mut self);
}
