use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub progress_interval_ticks: u64,
}

/// 世界設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    pub region_rect: RegionRect,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionRect {
    pub xmin_m: f64,
    pub xmax_m: f64,
    pub ymin_m: f64,
    pub ymax_m: f64,
}

/// 機体設定
///
/// 初期姿勢と一次遅れ応答モデルのパラメータです。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehicleConfig {
    pub initial_x_m: f64,
    pub initial_y_m: f64,
    pub initial_heading_rad: f64,
    pub surge_time_constant_s: f64,
    pub yaw_time_constant_s: f64,
    pub max_speed_mps: f64,
    pub max_yaw_rate_rad_s: f64,
}

/// 旋回圏試験の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurningCircleConfig {
    pub velocity_mps: f64,
    pub yaw_rate_rad_s: f64,
    pub duration_s: f64,
    pub spinup_ticks: usize,
}

/// 停止距離試験の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoppingConfig {
    pub initial_velocity_mps: f64,
    pub duration_s: f64,
    pub spinup_ticks: usize,
}

/// 加速試験の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccelerationConfig {
    pub target_velocity_mps: f64,
    pub duration_s: f64,
}

/// 3種類の操縦性能試験の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrialsConfig {
    pub turning_circle: TurningCircleConfig,
    pub stopping: StoppingConfig,
    pub acceleration: AccelerationConfig,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub world: WorldConfig,
    pub vehicle: VehicleConfig,
    pub trials: TrialsConfig,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "dt_s must be positive".to_string(),
            ));
        }

        // 座標範囲の検証
        let region = &self.world.region_rect;
        if region.xmin_m >= region.xmax_m || region.ymin_m >= region.ymax_m {
            return Err(ScenarioError::ValidationError(
                "Invalid region bounds".to_string(),
            ));
        }

        // 初期位置の検証
        if !self.is_position_in_bounds(self.vehicle.initial_x_m, self.vehicle.initial_y_m) {
            return Err(ScenarioError::ValidationError(
                "Vehicle initial position outside region bounds".to_string(),
            ));
        }

        // 応答パラメータの検証
        if self.vehicle.surge_time_constant_s <= 0.0 || self.vehicle.yaw_time_constant_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "Vehicle time constants must be positive".to_string(),
            ));
        }
        if self.vehicle.max_speed_mps <= 0.0 || self.vehicle.max_yaw_rate_rad_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "Vehicle limits must be positive".to_string(),
            ));
        }

        // 各試験設定の検証
        let turning = &self.trials.turning_circle;
        if turning.duration_s <= 0.0 || turning.velocity_mps <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "Turning circle trial requires positive duration and velocity".to_string(),
            ));
        }
        if turning.velocity_mps > self.vehicle.max_speed_mps {
            return Err(ScenarioError::ValidationError(format!(
                "Turning velocity {} exceeds vehicle max speed {}",
                turning.velocity_mps, self.vehicle.max_speed_mps
            )));
        }
        if turning.yaw_rate_rad_s <= 0.0 || turning.yaw_rate_rad_s > self.vehicle.max_yaw_rate_rad_s
        {
            return Err(ScenarioError::ValidationError(format!(
                "Turning yaw rate {} outside vehicle limit {}",
                turning.yaw_rate_rad_s, self.vehicle.max_yaw_rate_rad_s
            )));
        }

        let stopping = &self.trials.stopping;
        if stopping.duration_s <= 0.0 || stopping.initial_velocity_mps <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "Stopping trial requires positive duration and initial velocity".to_string(),
            ));
        }
        if stopping.initial_velocity_mps > self.vehicle.max_speed_mps {
            return Err(ScenarioError::ValidationError(format!(
                "Stopping initial velocity {} exceeds vehicle max speed {}",
                stopping.initial_velocity_mps, self.vehicle.max_speed_mps
            )));
        }

        let accel = &self.trials.acceleration;
        if accel.duration_s <= 0.0 || accel.target_velocity_mps <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "Acceleration trial requires positive duration and target velocity".to_string(),
            ));
        }
        if accel.target_velocity_mps > self.vehicle.max_speed_mps {
            return Err(ScenarioError::ValidationError(format!(
                "Acceleration target velocity {} exceeds vehicle max speed {}",
                accel.target_velocity_mps, self.vehicle.max_speed_mps
            )));
        }

        Ok(())
    }

    /// 位置が領域内かどうかをチェック
    fn is_position_in_bounds(&self, x: f64, y: f64) -> bool {
        let region = &self.world.region_rect;
        x >= region.xmin_m && x <= region.xmax_m && y >= region.ymin_m && y <= region.ymax_m
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!();

        println!("=== 機体設定 ===");
        println!("最大速度: {:.2} m/s", self.vehicle.max_speed_mps);
        println!(
            "最大ヨーレート: {:.2} rad/s",
            self.vehicle.max_yaw_rate_rad_s
        );
        println!(
            "時定数: 前進 {:.1}秒 / ヨー {:.1}秒",
            self.vehicle.surge_time_constant_s, self.vehicle.yaw_time_constant_s
        );
        println!();

        println!("=== 試験設定 ===");
        println!(
            "旋回圏試験: {:.1} m/s, ヨーレート {:.2} rad/s, 最大 {:.0}秒",
            self.trials.turning_circle.velocity_mps,
            self.trials.turning_circle.yaw_rate_rad_s,
            self.trials.turning_circle.duration_s
        );
        println!(
            "停止距離試験: 初速 {:.1} m/s, 最大 {:.0}秒",
            self.trials.stopping.initial_velocity_mps, self.trials.stopping.duration_s
        );
        println!(
            "加速試験: 目標 {:.1} m/s, 最大 {:.0}秒",
            self.trials.acceleration.target_velocity_mps, self.trials.acceleration.duration_s
        );
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
