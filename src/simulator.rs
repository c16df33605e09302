//! # Simulator モジュール
//!
//! 操縦性能試験の対象となるシミュレータセッションを提供します。
//!
//! このモジュールは、シナリオ設定から機体モデルを構築し、固定時間刻み（Δt）で
//! 操縦コマンドに応じた運動状態を進めるセッションを実装します。試験コントローラは
//! 1試験につき1セッションを開き、試験終了時に必ずセッションを閉じるため、
//! 試験間で物理状態が持ち越されることはありません。
//!
//! ## 主要機能
//!
//! - **セッションライフサイクル管理**: open → step × N → close
//! - **コマンド検証**: 非有限値コマンドの拒否
//! - **領域判定**: 機体が世界領域外に出た場合のエラー化
//!
//! ## 使用例
//!
//! ```rust
//! use usvtrial::scenario::ScenarioConfig;
//! use usvtrial::simulator::SimulatorSession;
//! use usvtrial::models::{ControlCommand, ISession};
//!
//! let config = ScenarioConfig::from_file("scenarios/otter_maneuver.yaml")?;
//! let mut session = SimulatorSession::open(&config)?;
//!
//! session.step(&ControlCommand::straight(2.0))?;
//! let state = session.current_state();
//! session.close();
//! ```

use crate::models::common::ControlCommand;
use crate::models::traits::ISession;
use crate::models::vehicle::{VehicleModel, VehicleState};
use crate::scenario::{RegionRect, ScenarioConfig};
use tracing::{debug, info};

/// シミュレーション実行エラー
#[derive(Debug)]
pub enum SimulationError {
    /// close済みセッションへのstep呼び出し
    SessionClosed,
    /// 非有限値を含む操縦コマンド
    InvalidCommand(String),
    /// 機体が世界領域外に出た
    OutOfRegion { x: f64, y: f64 },
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::SessionClosed => {
                write!(f, "セッションは既に終了しています")
            }
            SimulationError::InvalidCommand(msg) => {
                write!(f, "不正な操縦コマンド: {}", msg)
            }
            SimulationError::OutOfRegion { x, y } => {
                write!(f, "機体が領域外に出ました: ({:.1}, {:.1})", x, y)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

/// シミュレータセッション
///
/// 機体モデルと世界領域を所有し、ISession契約を実装します。
pub struct SimulatorSession {
    vehicle: VehicleModel,
    dt: f64,
    region: RegionRect,
    tick_count: u64,
    closed: bool,
}

impl SimulatorSession {
    /// シナリオ設定から新しいセッションを構築
    ///
    /// # 引数
    ///
    /// * `config` - 検証済みのシナリオ設定
    ///
    /// # 戻り値
    ///
    /// 初期姿勢が領域外の場合はエラー
    pub fn open(config: &ScenarioConfig) -> Result<Self, SimulationError> {
        let region = config.world.region_rect.clone();
        let vehicle = VehicleModel::from_config(&config.vehicle);

        if !Self::in_region(&region, vehicle.position.x, vehicle.position.y) {
            return Err(SimulationError::OutOfRegion {
                x: vehicle.position.x,
                y: vehicle.position.y,
            });
        }

        info!(
            dt = config.sim.dt_s,
            initial_x = vehicle.position.x,
            initial_y = vehicle.position.y,
            "SESSION_OPEN: シミュレータセッションを開始しました"
        );

        Ok(Self {
            vehicle,
            dt: config.sim.dt_s,
            region,
            tick_count: 0,
            closed: false,
        })
    }

    fn in_region(region: &RegionRect, x: f64, y: f64) -> bool {
        x >= region.xmin_m && x <= region.xmax_m && y >= region.ymin_m && y <= region.ymax_m
    }
}

impl ISession for SimulatorSession {
    fn step(&mut self, command: &ControlCommand) -> Result<(), SimulationError> {
        if self.closed {
            return Err(SimulationError::SessionClosed);
        }
        if !command.is_finite() {
            return Err(SimulationError::InvalidCommand(format!(
                "surge={}, yaw_rate={}",
                command.surge_mps, command.yaw_rate_rad_s
            )));
        }

        self.vehicle.integrate(command, self.dt);
        self.tick_count += 1;

        let position = self.vehicle.position;
        if !Self::in_region(&self.region, position.x, position.y) {
            return Err(SimulationError::OutOfRegion {
                x: position.x,
                y: position.y,
            });
        }

        Ok(())
    }

    fn current_state(&self) -> VehicleState {
        self.vehicle.state()
    }

    fn tick_period(&self) -> f64 {
        self.dt
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(
                ticks = self.tick_count,
                "SESSION_CLOSE: シミュレータセッションを終了しました"
            );
        }
    }
}

// 早期完了やエラー経路でcloseが漏れた場合の保険
impl Drop for SimulatorSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::tests::test_config;

    #[test]
    fn test_open_and_step() {
        let config = test_config();
        let mut session = SimulatorSession::open(&config).unwrap();
        assert_eq!(session.tick_period(), 0.1);

        let before = session.current_state();
        assert_eq!(before.speed(), 0.0);

        for _ in 0..100 {
            session.step(&ControlCommand::straight(2.0)).unwrap();
        }
        let after = session.current_state();
        assert!(after.speed() > 1.0);
        assert!(after.x > before.x);
        session.close();
    }

    #[test]
    fn test_step_after_close_fails() {
        let config = test_config();
        let mut session = SimulatorSession::open(&config).unwrap();
        session.close();
        // closeは冪等
        session.close();
        match session.step(&ControlCommand::straight(1.0)) {
            Err(SimulationError::SessionClosed) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_nonfinite_command_rejected() {
        let config = test_config();
        let mut session = SimulatorSession::open(&config).unwrap();
        match session.step(&ControlCommand::new(f64::NAN, 0.0)) {
            Err(SimulationError::InvalidCommand(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_region_detected() {
        let mut config = test_config();
        // 狭い領域でまっすぐ走らせれば境界を越える
        config.world.region_rect.xmax_m = 1.0;
        let mut session = SimulatorSession::open(&config).unwrap();
        let mut escaped = false;
        for _ in 0..200 {
            if let Err(SimulationError::OutOfRegion { .. }) =
                session.step(&ControlCommand::straight(3.0))
            {
                escaped = true;
                break;
            }
        }
        assert!(escaped);
    }

    #[test]
    fn test_initial_pose_outside_region_fails_open() {
        let mut config = test_config();
        config.vehicle.initial_x_m = 400.0;
        config.world.region_rect.xmax_m = 100.0;
        assert!(SimulatorSession::open(&config).is_err());
    }
}
