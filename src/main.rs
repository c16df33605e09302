mod logging;
mod metrics;
mod models;
mod report;
mod scenario;
mod simulator;
mod trial;

use clap::{Arg, Command};
use logging::{LogOutput, init_logging, level_from_verbosity};
use metrics::TrialMetrics;
use report::ReportAggregator;
use scenario::ScenarioConfig;
use std::str::FromStr;
use tracing::info;
use trial::TrialController;

/// デフォルトのシナリオファイル
const DEFAULT_SCENARIO: &str = "scenarios/otter_maneuver.yaml";

/// デフォルトの結果アーティファクト出力先
const DEFAULT_OUTPUT: &str = "results/otter_maneuver_results.yaml";

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("usvtrial")
        .version("0.1.0")
        .about("USV操縦性能試験 (USV Maneuverability Trial Suite)")
        .long_about(
            "Otter型USVの操縦性能試験スイート\n\
             旋回圏・停止距離・加速の3試験を固定順で実行し、\n\
             Tactical Diameterなどの性能指標を算出します。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .default_value(DEFAULT_SCENARIO)
                .help("シナリオファイル(.yaml)のパスを指定"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .default_value(DEFAULT_OUTPUT)
                .help("結果アーティファクト(.yaml)の出力先")
                .long_help(
                    "全試験の指標と記録（軌跡・速力・ヨーレート系列）を書き出す\n\
                     YAMLファイルのパスを指定します。外部の作図レイヤが読み込みます。",
                ),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("DEST")
                .default_value("console")
                .help("ログ出力先 (console, file, both)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細)"),
        )
        .get_matches();

    println!("USV操縦性能試験 (Maneuverability Trial Suite) - usvtrial v0.1.0");
    println!();

    // ログシステムの初期化
    let verbose_level = matches.get_count("verbose");
    let log_output_name = matches
        .get_one::<String>("log-output")
        .map(String::as_str)
        .unwrap_or("console");
    let log_output = match LogOutput::from_str(log_output_name) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_logging(level_from_verbosity(verbose_level), log_output) {
        eprintln!("エラー: ログ初期化に失敗しました: {}", e);
        std::process::exit(1);
    }

    let scenario_path = matches
        .get_one::<String>("scenario")
        .map(String::as_str)
        .unwrap_or(DEFAULT_SCENARIO);
    let output_path = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(DEFAULT_OUTPUT);

    match run_trials(scenario_path, output_path, matches.get_flag("info")) {
        Ok(_) => {
            if verbose_level > 0 {
                println!("全試験が正常に完了しました。");
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

/// シナリオを読み込んで全試験を実行
///
/// 旋回圏 → 停止距離 → 加速の固定順で実行し、要約レポートの表示と
/// 結果アーティファクトの書き出しを行います。シミュレータ側のエラーは
/// 致命的としてそのまま呼び出し元へ返します。
fn run_trials(
    scenario_path: &str,
    output_path: &str,
    info_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // シナリオファイルの読み込み
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    // 基本情報表示
    scenario.print_summary();
    println!();

    // 情報表示のみの場合
    if info_only {
        return Ok(());
    }

    let controller = TrialController::new(scenario);
    let mut aggregator = ReportAggregator::new();

    info!("=== 旋回圏試験 開始 ===");
    let record = controller.run_turning_circle()?;
    aggregator.store(TrialMetrics::from_record(&record));

    info!("=== 停止距離試験 開始 ===");
    let record = controller.run_stopping()?;
    aggregator.store(TrialMetrics::from_record(&record));

    info!("=== 加速試験 開始 ===");
    let record = controller.run_acceleration()?;
    aggregator.store(TrialMetrics::from_record(&record));

    // 要約レポートと結果アーティファクト
    aggregator.print_summary();
    aggregator.write_artifact(output_path)?;

    Ok(())
}
