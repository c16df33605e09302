//! # Trial モジュール
//!
//! 操縦性能試験の中核となる試験コントローラを提供します。
//!
//! このモジュールは、旋回圏試験・停止距離試験・加速試験の3種類の
//! フェーズ状態機械を実装します。各試験は毎ティック操縦コマンドを発行し、
//! サンプリングした機体状態から完了条件を判定します。完了条件が成立しない
//! 場合でも、ティック予算（`duration / dt`）により必ず終了します。
//!
//! ## 試験の構成
//!
//! 1. **旋回圏試験**: 加速フェーズ → 旋回フェーズ。方位変化量が360度を
//!    初めて超えたサンプルで完了します。
//! 2. **停止距離試験**: 加速フェーズ → 逆推進フェーズ。速力が0.05 m/sを
//!    下回ったサンプルで完了します。
//! 3. **加速試験**: 単一フェーズ。速力が目標の95%に達したサンプルで完了します。
//!
//! ## セッションの扱い
//!
//! 1試験につき1セッションを開いて閉じるため、試験は互いに独立です。
//! シミュレータ側のエラーは再試行せず、そのまま呼び出し元へ伝播します。

use crate::models::common::{ControlCommand, Position2D, math_utils};
use crate::models::traits::ISession;
use crate::models::vehicle::VehicleState;
use crate::scenario::{
    AccelerationConfig, ScenarioConfig, StoppingConfig, TurningCircleConfig,
};
use crate::simulator::{SimulationError, SimulatorSession};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 停止判定の速力しきい値[m/s]
pub const STOP_SPEED_THRESHOLD: f64 = 0.05;

/// 加速完了判定の目標速度比
pub const ACCEL_TARGET_RATIO: f64 = 0.95;

/// 試験種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialKind {
    TurningCircle,
    Stopping,
    Acceleration,
}

impl std::fmt::Display for TrialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrialKind::TurningCircle => write!(f, "turning_circle"),
            TrialKind::Stopping => write!(f, "stopping"),
            TrialKind::Acceleration => write!(f, "acceleration"),
        }
    }
}

/// 1ティック分の記録サンプル
///
/// 機体状態スナップショットから導出したスカラー値の組です。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrialSample {
    pub time_s: f64,
    pub x: f64,           // m (North)
    pub y: f64,           // m (East)
    pub heading_deg: f64, // 累積方位角[deg]（正規化なし）
    pub speed_mps: f64,
    pub yaw_rate_rad_s: f64,
}

impl TrialSample {
    /// 機体状態スナップショットからサンプルを導出（状態サンプラ）
    ///
    /// # 引数
    ///
    /// * `state` - シミュレータから読み取った機体状態
    /// * `time_s` - 記録開始からの経過時間[s]（`tick_index × dt`）
    pub fn from_state(state: &VehicleState, time_s: f64) -> Self {
        Self {
            time_s,
            x: state.x,
            y: state.y,
            heading_deg: math_utils::rad_to_deg(state.heading_rad),
            speed_mps: state.speed(),
            yaw_rate_rad_s: state.yaw_rate,
        }
    }

    /// サンプル位置を取得
    pub fn position(&self) -> Position2D {
        Position2D::new(self.x, self.y)
    }
}

/// 1試験分の記録
///
/// データ収集フェーズで毎ティック追記され、試験完了時に凍結されます。
/// サンプル数は、完了条件成立またはティック予算到達までに実行した
/// ティック数と常に一致します。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub kind: TrialKind,
    pub dt_s: f64,
    /// データ収集開始時点の位置（停止距離試験では制動開始原点）
    pub start_position: Position2D,
    /// データ収集開始時点の累積方位角[deg]
    pub start_heading_deg: f64,
    /// データ収集開始時点の実測速力[m/s]（コマンド値ではない）
    pub initial_speed_mps: f64,
    /// コマンドとして与えた目標速度[m/s]
    pub target_speed_mps: f64,
    pub samples: Vec<TrialSample>,
}

impl TrialRecord {
    fn begin(kind: TrialKind, dt_s: f64, start: &VehicleState, target_speed_mps: f64) -> Self {
        Self {
            kind,
            dt_s,
            start_position: start.position(),
            start_heading_deg: math_utils::rad_to_deg(start.heading_rad),
            initial_speed_mps: start.speed(),
            target_speed_mps,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_sample(&self) -> Option<&TrialSample> {
        self.samples.last()
    }
}

/// 試験コントローラ
///
/// 試験種別ごとに1つの入口を公開します。各呼び出しは自前の
/// シミュレータセッションを開き、試験終了時に必ず閉じます。
pub struct TrialController {
    scenario: ScenarioConfig,
}

impl TrialController {
    pub fn new(scenario: ScenarioConfig) -> Self {
        Self { scenario }
    }

    /// 旋回圏試験を実行
    pub fn run_turning_circle(&self) -> Result<TrialRecord, SimulationError> {
        let mut session = SimulatorSession::open(&self.scenario)?;
        let result = run_turning_circle(
            &mut session,
            &self.scenario.trials.turning_circle,
            self.scenario.sim.progress_interval_ticks,
        );
        session.close();
        result
    }

    /// 停止距離試験を実行
    pub fn run_stopping(&self) -> Result<TrialRecord, SimulationError> {
        let mut session = SimulatorSession::open(&self.scenario)?;
        let result = run_stopping(
            &mut session,
            &self.scenario.trials.stopping,
            self.scenario.sim.progress_interval_ticks,
        );
        session.close();
        result
    }

    /// 加速試験を実行
    pub fn run_acceleration(&self) -> Result<TrialRecord, SimulationError> {
        let mut session = SimulatorSession::open(&self.scenario)?;
        let result = run_acceleration(
            &mut session,
            &self.scenario.trials.acceleration,
            self.scenario.sim.progress_interval_ticks,
        );
        session.close();
        result
    }
}

/// ティック予算を計算
fn max_steps(duration_s: f64, dt: f64) -> usize {
    (duration_s / dt) as usize
}

/// 旋回圏試験のフェーズ状態機械
///
/// フェーズ1で一定ティック直進して定常速力に達した後、フェーズ2で
/// 一定の旋回コマンドを与え続け、累積方位変化が360度を初めて超えた
/// サンプルで記録を打ち切ります。完了条件が成立しなくても予算到達で
/// 部分データのまま正常終了します（エラーにはなりません）。
pub fn run_turning_circle<S: ISession>(
    session: &mut S,
    config: &TurningCircleConfig,
    progress_interval_ticks: u64,
) -> Result<TrialRecord, SimulationError> {
    let dt = session.tick_period();
    let budget = max_steps(config.duration_s, dt);

    // フェーズ1: 加速（記録なし）
    info!(
        velocity = config.velocity_mps,
        spinup_ticks = config.spinup_ticks,
        "TRIAL_PHASE: 旋回圏試験 加速フェーズ開始"
    );
    let spinup_command = ControlCommand::straight(config.velocity_mps);
    for _ in 0..config.spinup_ticks {
        session.step(&spinup_command)?;
    }

    // フェーズ2: 旋回（記録あり）
    let start = session.current_state();
    let mut record = TrialRecord::begin(TrialKind::TurningCircle, dt, &start, config.velocity_mps);
    info!(
        start_heading_deg = record.start_heading_deg,
        yaw_rate = config.yaw_rate_rad_s,
        budget,
        "TRIAL_PHASE: 旋回圏試験 旋回フェーズ開始"
    );

    let turn_command = ControlCommand::new(config.velocity_mps, config.yaw_rate_rad_s);
    let mut completed = false;
    for tick in 0..budget {
        session.step(&turn_command)?;
        let sample = TrialSample::from_state(&session.current_state(), tick as f64 * dt);
        record.samples.push(sample);

        // 360度旋回の完了判定（累積方位角に対する厳密な超過判定）
        let heading_change = (sample.heading_deg - record.start_heading_deg).abs();
        if heading_change > 360.0 {
            info!(
                ticks = record.len(),
                heading_change,
                "TRIAL_COMPLETE: 360度旋回を完了しました"
            );
            completed = true;
            break;
        }

        if progress_interval_ticks > 0 && (tick as u64 + 1) % progress_interval_ticks == 0 {
            let recent = &record.samples[record.len().saturating_sub(50)..];
            let recent_yaw: Vec<f64> = recent.iter().map(|s| s.yaw_rate_rad_s).collect();
            debug!(
                heading_change,
                mean_yaw_rate = math_utils::mean(&recent_yaw),
                "TRIAL_PROGRESS: 旋回中"
            );
        }
    }

    if !completed {
        warn!(
            ticks = record.len(),
            "TRIAL_BUDGET: 旋回が完了する前にティック予算に達しました"
        );
    }

    Ok(record)
}

/// 停止距離試験のフェーズ状態機械
///
/// フェーズ1で一定ティック直進し、最後に到達した位置を制動開始原点、
/// 実測速力を報告用初速として記録します。フェーズ2で逆推進コマンドを
/// 与え続け、速力が0.05 m/sを下回ったサンプルで完了します。
pub fn run_stopping<S: ISession>(
    session: &mut S,
    config: &StoppingConfig,
    progress_interval_ticks: u64,
) -> Result<TrialRecord, SimulationError> {
    let dt = session.tick_period();
    let budget = max_steps(config.duration_s, dt);

    // フェーズ1: 加速（記録なし）
    info!(
        velocity = config.initial_velocity_mps,
        spinup_ticks = config.spinup_ticks,
        "TRIAL_PHASE: 停止距離試験 加速フェーズ開始"
    );
    let spinup_command = ControlCommand::straight(config.initial_velocity_mps);
    for _ in 0..config.spinup_ticks {
        session.step(&spinup_command)?;
    }

    // フェーズ2: 逆推進（記録あり）
    let start = session.current_state();
    let mut record =
        TrialRecord::begin(TrialKind::Stopping, dt, &start, config.initial_velocity_mps);
    info!(
        attained_speed = record.initial_speed_mps,
        budget,
        "TRIAL_PHASE: 停止距離試験 逆推進フェーズ開始"
    );

    let brake_command = ControlCommand::straight(-config.initial_velocity_mps);
    let mut completed = false;
    for tick in 0..budget {
        session.step(&brake_command)?;
        let sample = TrialSample::from_state(&session.current_state(), tick as f64 * dt);
        record.samples.push(sample);

        if sample.speed_mps < STOP_SPEED_THRESHOLD {
            info!(
                ticks = record.len(),
                stopping_time = record.len() as f64 * dt,
                "TRIAL_COMPLETE: 停止しました"
            );
            completed = true;
            break;
        }

        if progress_interval_ticks > 0 && (tick as u64 + 1) % progress_interval_ticks == 0 {
            debug!(speed = sample.speed_mps, "TRIAL_PROGRESS: 制動中");
        }
    }

    if !completed {
        warn!(
            ticks = record.len(),
            "TRIAL_BUDGET: 停止する前にティック予算に達しました"
        );
    }

    Ok(record)
}

/// 加速試験の状態機械（単一フェーズ）
///
/// 停止状態から目標速度コマンドを与え続け、速力が目標の95%に達した
/// サンプルで完了します。
pub fn run_acceleration<S: ISession>(
    session: &mut S,
    config: &AccelerationConfig,
    progress_interval_ticks: u64,
) -> Result<TrialRecord, SimulationError> {
    let dt = session.tick_period();
    let budget = max_steps(config.duration_s, dt);

    let start = session.current_state();
    let mut record = TrialRecord::begin(
        TrialKind::Acceleration,
        dt,
        &start,
        config.target_velocity_mps,
    );
    info!(
        target = config.target_velocity_mps,
        budget,
        "TRIAL_PHASE: 加速試験開始"
    );

    let command = ControlCommand::straight(config.target_velocity_mps);
    let threshold = ACCEL_TARGET_RATIO * config.target_velocity_mps;
    let mut completed = false;
    for tick in 0..budget {
        session.step(&command)?;
        let sample = TrialSample::from_state(&session.current_state(), tick as f64 * dt);
        record.samples.push(sample);

        if sample.speed_mps >= threshold {
            info!(
                ticks = record.len(),
                speed = sample.speed_mps,
                "TRIAL_COMPLETE: 目標速度の95%に到達しました"
            );
            completed = true;
            break;
        }

        if progress_interval_ticks > 0 && (tick as u64 + 1) % progress_interval_ticks == 0 {
            debug!(speed = sample.speed_mps, "TRIAL_PROGRESS: 加速中");
        }
    }

    if !completed {
        warn!(
            ticks = record.len(),
            "TRIAL_BUDGET: 目標速度に達する前にティック予算に達しました"
        );
    }

    Ok(record)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::common::math_utils::deg_to_rad;

    /// 事前に用意した状態列を順に返すテスト用セッション
    ///
    /// 状態列を使い切った後は最後の状態を返し続けます。
    pub(crate) struct ScriptedSession {
        states: Vec<VehicleState>,
        cursor: usize,
        dt: f64,
        fail_at: Option<usize>,
        steps: usize,
    }

    impl ScriptedSession {
        pub(crate) fn new(states: Vec<VehicleState>, dt: f64) -> Self {
            Self {
                states,
                cursor: 0,
                dt,
                fail_at: None,
                steps: 0,
            }
        }

        fn failing_at(mut self, step: usize) -> Self {
            self.fail_at = Some(step);
            self
        }
    }

    impl ISession for ScriptedSession {
        fn step(&mut self, _command: &ControlCommand) -> Result<(), SimulationError> {
            if let Some(fail_at) = self.fail_at {
                if self.steps >= fail_at {
                    return Err(SimulationError::OutOfRegion { x: 0.0, y: 0.0 });
                }
            }
            self.steps += 1;
            if self.cursor + 1 < self.states.len() {
                self.cursor += 1;
            }
            Ok(())
        }

        fn current_state(&self) -> VehicleState {
            self.states[self.cursor]
        }

        fn tick_period(&self) -> f64 {
            self.dt
        }

        fn close(&mut self) {}
    }

    /// 方位角が1ティックあたりstep_degずつ増える状態列を生成
    pub(crate) fn heading_ramp(count: usize, step_deg: f64, speed: f64) -> Vec<VehicleState> {
        (0..count)
            .map(|i| {
                let heading_rad = deg_to_rad(i as f64 * step_deg);
                VehicleState {
                    x: i as f64,
                    y: 0.0,
                    heading_rad,
                    vx: speed * heading_rad.cos(),
                    vy: speed * heading_rad.sin(),
                    yaw_rate: deg_to_rad(step_deg) / 0.1,
                }
            })
            .collect()
    }

    /// 速力が1ティックあたりstep_mpsずつ変化する直進状態列を生成
    pub(crate) fn speed_ramp(count: usize, start_mps: f64, step_mps: f64) -> Vec<VehicleState> {
        (0..count)
            .map(|i| {
                let speed = start_mps + i as f64 * step_mps;
                VehicleState {
                    x: i as f64,
                    y: 0.0,
                    heading_rad: 0.0,
                    vx: speed,
                    vy: 0.0,
                    yaw_rate: 0.0,
                }
            })
            .collect()
    }

    fn turning_config(spinup_ticks: usize, duration_s: f64) -> TurningCircleConfig {
        TurningCircleConfig {
            velocity_mps: 2.0,
            yaw_rate_rad_s: 0.5,
            duration_s,
            spinup_ticks,
        }
    }

    #[test]
    fn test_turning_completes_at_first_sample_over_360() {
        // 方位が10度/ティックで増加: 370度(>360)となる37ティック目で完了する
        let mut session = ScriptedSession::new(heading_ramp(100, 10.0, 2.0), 0.1);
        let record = run_turning_circle(&mut session, &turning_config(0, 60.0), 0).unwrap();
        assert_eq!(record.len(), 37);
        let last = record.last_sample().unwrap();
        assert!((last.heading_deg - 370.0).abs() < 1e-9);
        // 36ティック目（ちょうど360度）では完了しない
        assert!(record.samples[35].heading_deg <= 360.0 + 1e-9);
    }

    #[test]
    fn test_turning_budget_fallback_keeps_partial_data() {
        // 方位が1度/ティックでは360度に届かず、予算で終了する
        let mut session = ScriptedSession::new(heading_ramp(100, 1.0, 2.0), 0.25);
        let record = run_turning_circle(&mut session, &turning_config(0, 5.0), 0).unwrap();
        assert_eq!(record.len(), 20); // 5.0秒 / 0.25秒 = 20ティック
    }

    #[test]
    fn test_turning_spinup_not_recorded() {
        let mut session = ScriptedSession::new(heading_ramp(200, 10.0, 2.0), 0.1);
        let record = run_turning_circle(&mut session, &turning_config(5, 60.0), 0).unwrap();
        // 加速フェーズの5ティック分は記録されず、開始方位は50度になる
        assert!((record.start_heading_deg - 50.0).abs() < 1e-9);
        assert!(record.len() < 200);
    }

    #[test]
    fn test_stopping_completes_below_threshold() {
        // 速力が3.0から0.1ずつ低下: 0.0(<0.05)となる30ティック目で完了する
        let mut session = ScriptedSession::new(speed_ramp(40, 3.0, -0.1), 0.1);
        let config = StoppingConfig {
            initial_velocity_mps: 3.0,
            duration_s: 30.0,
            spinup_ticks: 0,
        };
        let record = run_stopping(&mut session, &config, 0).unwrap();
        assert_eq!(record.len(), 30);
        assert!(record.last_sample().unwrap().speed_mps < STOP_SPEED_THRESHOLD);
        // 実測初速はコマンド値ではなく状態列の先頭値
        assert!((record.initial_speed_mps - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stopping_records_brake_origin() {
        let mut session = ScriptedSession::new(speed_ramp(40, 3.0, -0.1), 0.1);
        let config = StoppingConfig {
            initial_velocity_mps: 3.0,
            duration_s: 30.0,
            spinup_ticks: 10,
        };
        let record = run_stopping(&mut session, &config, 0).unwrap();
        // 加速フェーズ10ティック後の位置が制動開始原点になる
        assert!((record.start_position.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_acceleration_completes_at_95_percent() {
        // 速力が0.1ずつ上昇: 2.9(>=2.85)となる29ティック目で完了する
        let mut session = ScriptedSession::new(speed_ramp(100, 0.0, 0.1), 0.1);
        let config = AccelerationConfig {
            target_velocity_mps: 3.0,
            duration_s: 20.0,
        };
        let record = run_acceleration(&mut session, &config, 0).unwrap();
        assert_eq!(record.len(), 29);
        assert!(record.last_sample().unwrap().speed_mps >= 2.85);
    }

    #[test]
    fn test_tick_budget_never_exceeded() {
        let config = AccelerationConfig {
            target_velocity_mps: 3.0,
            duration_s: 7.5,
        };
        // 速力が全く上がらない状態列でも 7.5秒 / 0.5秒 = 15ティックで終了する
        let mut session = ScriptedSession::new(speed_ramp(1, 0.0, 0.0), 0.5);
        let record = run_acceleration(&mut session, &config, 0).unwrap();
        assert_eq!(record.len(), 15);
    }

    #[test]
    fn test_sample_time_is_tick_index_times_dt() {
        let mut session = ScriptedSession::new(speed_ramp(100, 0.0, 0.1), 0.1);
        let config = AccelerationConfig {
            target_velocity_mps: 3.0,
            duration_s: 20.0,
        };
        let record = run_acceleration(&mut session, &config, 0).unwrap();
        assert_eq!(record.samples[0].time_s, 0.0);
        assert!((record.samples[10].time_s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulator_error_propagates() {
        let session = ScriptedSession::new(heading_ramp(100, 10.0, 2.0), 0.1);
        let mut session = session.failing_at(10);
        let result = run_turning_circle(&mut session, &turning_config(0, 60.0), 0);
        assert!(result.is_err());
    }
}
