//! ターゲットアクセスのエラー型

use thiserror::Error;

/// トレース対象へのアクセスで発生するエラー
#[derive(Debug, Error)]
pub enum TraceError {
    /// アドレス空間間のコピーが要求バイト数に満たなかった
    ///
    /// トレース対象の終了、ページの未マッピング、書き込み禁止などで発生します。
    /// 自動リトライは行わず、呼び出し元が報告するか再試行するかを決めます。
    #[error("short copy at 0x{addr:x}: {copied} of {expected} bytes transferred")]
    ShortCopy {
        addr: u64,
        expected: usize,
        copied: usize,
    },

    /// OSレベルのI/Oエラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TraceError {
    /// ショートコピーエラーを作成する
    pub fn short_copy(addr: u64, expected: usize, copied: usize) -> Self {
        Self::ShortCopy {
            addr,
            expected,
            copied,
        }
    }
}
