//! # Report モジュール
//!
//! 複数試験の指標を試験種別ごとに集約し、要約レポートの描画と
//! 結果アーティファクトの書き出しを提供します。集約器は再計算を
//! 一切行わず、格納順（=実行順）を保持した純粋な提示層です。

use crate::metrics::TrialMetrics;
use crate::models::common::math_utils;
use crate::trial::TrialKind;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// 試験結果の集約器
///
/// 試験種別をキーとする挿入順保持のマッピングです。同じ種別を
/// 再格納した場合は元の位置のまま内容だけ置き換えます。
pub struct ReportAggregator {
    entries: Vec<(TrialKind, TrialMetrics)>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 指標を格納（キーは指標自身の試験種別）
    pub fn store(&mut self, metrics: TrialMetrics) {
        let kind = metrics.kind();
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = metrics,
            None => self.entries.push((kind, metrics)),
        }
    }

    /// 試験種別で指標を取得
    pub fn get(&self, kind: TrialKind) -> Option<&TrialMetrics> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, m)| m)
    }

    /// 格納済みの試験種別を挿入順で取得
    pub fn stored_kinds(&self) -> Vec<TrialKind> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 要約レポートを文字列として描画
    ///
    /// 格納順に各試験の代表指標を列挙します。出力は決定的です。
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "=".repeat(60)));
        out.push_str("操縦性能試験 要約レポート (Maneuverability Summary)\n");
        out.push_str(&format!("{}\n", "=".repeat(60)));

        for (_, metrics) in &self.entries {
            match metrics {
                TrialMetrics::TurningCircle(m) => {
                    out.push('\n');
                    out.push_str(&format!("[旋回圏試験 @ {:.2} m/s]\n", m.velocity_mps));
                    out.push_str(&format!(
                        "  Tactical Diameter: {:.2} m\n",
                        m.tactical_diameter_m
                    ));
                    out.push_str(&format!("  Advance (90°): {:.2} m\n", m.advance_m));
                    out.push_str(&format!("  Transfer (90°): {:.2} m\n", m.transfer_m));
                    out.push_str(&format!(
                        "  Steady Turning Radius: {:.2} m\n",
                        m.steady_radius_m
                    ));
                    out.push_str(&format!(
                        "  平均ヨーレート: {:.3} rad/s ({:.1}°/s)\n",
                        m.avg_yaw_rate_rad_s,
                        math_utils::rad_to_deg(m.avg_yaw_rate_rad_s)
                    ));
                }
                TrialMetrics::Stopping(m) => {
                    out.push('\n');
                    out.push_str(&format!(
                        "[停止距離試験 @ {:.2} m/s]\n",
                        m.initial_velocity_mps
                    ));
                    out.push_str(&format!("  停止距離: {:.2} m\n", m.stopping_distance_m));
                    out.push_str(&format!("  停止時間: {:.2} s\n", m.stopping_time_s));
                    out.push_str(&format!(
                        "  平均減速度: {:.3} m/s²\n",
                        m.avg_deceleration_mps2
                    ));
                }
                TrialMetrics::Acceleration(m) => {
                    out.push('\n');
                    out.push_str(&format!("[加速試験 目標 {:.2} m/s]\n", m.target_velocity_mps));
                    out.push_str(&format!("  到達時間 (95%): {:.2} s\n", m.accel_time_s));
                    out.push_str(&format!("  加速距離: {:.2} m\n", m.accel_distance_m));
                    out.push_str(&format!(
                        "  平均加速度: {:.3} m/s²\n",
                        m.avg_acceleration_mps2
                    ));
                }
            }
        }

        out.push('\n');
        out.push_str(&format!("{}\n", "=".repeat(60)));
        out
    }

    /// 要約レポートを標準出力へ表示
    pub fn print_summary(&self) {
        print!("{}", self.render_summary());
    }

    /// 結果アーティファクトをYAMLとして書き出し
    ///
    /// 外部の作図・レポート層が読む入力で、全試験の指標と
    /// 元記録（軌跡・速力・ヨーレート系列）を含みます。
    pub fn write_artifact<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ReportError::IoError(parent.to_path_buf(), e))?;
            }
        }

        let artifact = Artifact {
            results: self
                .entries
                .iter()
                .map(|(kind, metrics)| ArtifactEntry {
                    trial: kind.to_string(),
                    metrics,
                })
                .collect(),
        };
        let yaml = serde_yaml::to_string(&artifact).map_err(ReportError::SerializeError)?;
        fs::write(path, yaml).map_err(|e| ReportError::IoError(path.to_path_buf(), e))?;

        info!(
            path = %path.display(),
            trials = self.len(),
            "ARTIFACT_WRITTEN: 結果ファイルを書き出しました"
        );
        Ok(())
    }
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// 結果アーティファクトのルート構造
#[derive(Serialize)]
struct Artifact<'a> {
    results: Vec<ArtifactEntry<'a>>,
}

#[derive(Serialize)]
struct ArtifactEntry<'a> {
    trial: String,
    metrics: &'a TrialMetrics,
}

/// レポート出力エラー
#[derive(Debug)]
pub enum ReportError {
    IoError(std::path::PathBuf, std::io::Error),
    SerializeError(serde_yaml::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::IoError(path, err) => {
                write!(f, "結果ファイル書き込みエラー {}: {}", path.display(), err)
            }
            ReportError::SerializeError(err) => {
                write!(f, "結果のシリアライズエラー: {}", err)
            }
        }
    }
}

impl std::error::Error for ReportError {}
