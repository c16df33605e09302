//! # Logging モジュール
//!
//! 操縦性能試験スイートのログ出力設定を提供します。
//!
//! tracing-subscriberのレイヤ合成でコンソール出力（compact形式）と
//! ファイル出力（JSON形式、tracing-appenderによる非同期書き込み）を
//! 組み合わせます。ファイルは`logs/`配下に日次ローテーションで
//! 書き出され、試験のフェーズ遷移・完了イベントが構造化ログとして
//! 残ります。

use std::str::FromStr;
use tracing::Level;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// ログファイルの出力先ディレクトリ
pub const LOG_DIR: &str = "logs";

/// ログファイル名のプレフィックス
pub const LOG_FILE_PREFIX: &str = "usvtrial";

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ（logs/usvtrial.<date>）
    File,
    /// コンソールとファイルの両方
    Both,
}

impl LogOutput {
    fn with_console(&self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn with_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

/// 詳細出力レベル（-vの個数）をログレベルへ変換
pub fn level_from_verbosity(verbose_level: u8) -> Level {
    match verbose_level {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログシステムを初期化
///
/// 環境変数`RUST_LOG`が設定されている場合はそちらを優先します。
/// ファイル出力時はログディレクトリを作成し、書き込みガードを
/// プロセス終了までリークさせて非同期書き込みを維持します。
///
/// # 引数
///
/// * `level` - 既定のログレベル
/// * `output` - 出力先（コンソール / ファイル / 両方）
pub fn init_logging(level: Level, output: LogOutput) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = output.with_console().then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    let file_layer = if output.with_file() {
        std::fs::create_dir_all(LOG_DIR)?;
        let file_appender = rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        // ガードをリークさせて非同期書き込みを維持
        std::mem::forget(guard);

        Some(
            fmt::layer()
                .with_writer(non_blocking_appender)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_from_str() {
        assert_eq!(LogOutput::from_str("console"), Ok(LogOutput::Console));
        assert_eq!(LogOutput::from_str("FILE"), Ok(LogOutput::File));
        assert_eq!(LogOutput::from_str("both"), Ok(LogOutput::Both));
        assert!(LogOutput::from_str("invalid").is_err());
    }

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), Level::INFO);
        assert_eq!(level_from_verbosity(1), Level::DEBUG);
        assert_eq!(level_from_verbosity(3), Level::TRACE);
    }
}
