//! パース関連のユーティリティ関数

use alstep_target::registers::{REG_F0, REG_FPCR, REG_PC, REG_SP, REG_UNIQUE, REG_ZERO};
use anyhow::Result;

/// アドレス文字列をu64にパース
///
/// 16進数（0xプレフィックス付き）または10進数をサポート
///
/// # Examples
/// ```
/// use alstep_core::parse::parse_address;
///
/// assert_eq!(parse_address("0x1234").unwrap(), 0x1234);
/// assert_eq!(parse_address("1234").unwrap(), 1234);
/// ```
pub fn parse_address(s: &str) -> Result<u64> {
    let s = s.trim();

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid hexadecimal address '{}': {}", s, e))
    } else {
        // 10進数でもダメなら16進数として解釈を試みる
        s.parse::<u64>()
            .or_else(|_| u64::from_str_radix(s, 16))
            .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", s, e))
    }
}

/// レジスタ名または番号をレジスタ番号にパース
///
/// `r0`-`r31`, `f0`-`f31`, `gp`, `sp`, `zero`, `fpcr`, `pc`, `unique`、
/// または `$` 付き・なしの10進番号を受け付けます。
pub fn parse_register(s: &str) -> Result<u64> {
    let s = s.trim().trim_start_matches('$').to_ascii_lowercase();

    let numbered = |prefix: &str, base: u64| -> Option<u64> {
        s.strip_prefix(prefix)
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n < 32)
            .map(|n| base + n)
    };

    let regno = match s.as_str() {
        "gp" => Some(29),
        "sp" => Some(REG_SP),
        "zero" => Some(REG_ZERO),
        "fpcr" => Some(REG_FPCR),
        "pc" => Some(REG_PC),
        "unique" => Some(REG_UNIQUE),
        _ => numbered("r", 0)
            .or_else(|| numbered("f", REG_F0))
            .or_else(|| s.parse::<u64>().ok()),
    };

    regno.ok_or_else(|| anyhow::anyhow!("Invalid register '{}'", s))
}
