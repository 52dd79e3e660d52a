//! レジスタ番号と保存位置の解決
//!
//! トレーサが使うレジスタ番号は次の通りです。
//!
//! | 番号      | レジスタ                        |
//! |-----------|---------------------------------|
//! | 0..=28    | 汎用レジスタ r0-r28             |
//! | 29        | gp                              |
//! | 30        | ユーザースタックポインタ (usp)  |
//! | 31        | ゼロレジスタ                    |
//! | 32..=62   | 浮動小数点レジスタ f0-f30       |
//! | 63        | FPCR                            |
//! | 64        | PC                              |
//! | 65        | スレッド固有値 (unique)         |
//!
//! それ以外の番号はゼロレジスタの別名として扱います。

use crate::context::{SwitchSlot, TrapSlot};

/// 最初の浮動小数点レジスタの番号
pub const REG_F0: u64 = 32;
/// ユーザースタックポインタの番号
pub const REG_SP: u64 = 30;
/// ゼロレジスタの番号
pub const REG_ZERO: u64 = 31;
/// FPCRの番号
pub const REG_FPCR: u64 = 63;
/// PCの番号
pub const REG_PC: u64 = 64;
/// スレッド固有値の番号
pub const REG_UNIQUE: u64 = 65;

/// レジスタの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// 汎用レジスタ r0-r29（29はgp）
    Gpr(u8),
    /// ユーザースタックポインタ
    UserSp,
    /// ゼロレジスタ（範囲外の番号を含む）
    Zero,
    /// 浮動小数点レジスタ f0-f30
    Fpr(u8),
    /// 浮動小数点制御レジスタ
    Fpcr,
    /// プログラムカウンタ
    Pc,
    /// スレッド固有値
    Unique,
}

/// レジスタの保存位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegLocation {
    /// トラップフレーム内
    Trap(TrapSlot),
    /// スイッチフレーム内
    Switch(SwitchSlot),
    /// PCBに保存されたユーザースタックポインタ
    UserSp,
    /// PCBに保存されたスレッド固有値
    Unique,
    /// 常にゼロを読み、書き込みは捨てる
    Zero,
}

impl Register {
    /// レジスタ番号を分類する
    ///
    /// すべての番号がちょうど1つの分類に対応します。
    pub const fn from_index(index: u64) -> Self {
        match index {
            0..=29 => Register::Gpr(index as u8),
            REG_SP => Register::UserSp,
            32..=62 => Register::Fpr((index - REG_F0) as u8),
            REG_FPCR => Register::Fpcr,
            REG_PC => Register::Pc,
            REG_UNIQUE => Register::Unique,
            _ => Register::Zero,
        }
    }

    /// レジスタ番号を取得する
    pub const fn index(self) -> u64 {
        match self {
            Register::Gpr(n) => n as u64,
            Register::UserSp => REG_SP,
            Register::Zero => REG_ZERO,
            Register::Fpr(n) => REG_F0 + n as u64,
            Register::Fpcr => REG_FPCR,
            Register::Pc => REG_PC,
            Register::Unique => REG_UNIQUE,
        }
    }

    /// 保存位置を取得する
    ///
    /// r0-r8, r16-r28, gp, pc はトラップフレーム、r9-r15 と浮動小数点レジスタは
    /// スイッチフレームに保存されています。
    pub const fn location(self) -> RegLocation {
        match self {
            Register::Gpr(n) => match n {
                0 => RegLocation::Trap(TrapSlot::R0),
                1 => RegLocation::Trap(TrapSlot::R1),
                2 => RegLocation::Trap(TrapSlot::R2),
                3 => RegLocation::Trap(TrapSlot::R3),
                4 => RegLocation::Trap(TrapSlot::R4),
                5 => RegLocation::Trap(TrapSlot::R5),
                6 => RegLocation::Trap(TrapSlot::R6),
                7 => RegLocation::Trap(TrapSlot::R7),
                8 => RegLocation::Trap(TrapSlot::R8),
                9 => RegLocation::Switch(SwitchSlot::R9),
                10 => RegLocation::Switch(SwitchSlot::R10),
                11 => RegLocation::Switch(SwitchSlot::R11),
                12 => RegLocation::Switch(SwitchSlot::R12),
                13 => RegLocation::Switch(SwitchSlot::R13),
                14 => RegLocation::Switch(SwitchSlot::R14),
                15 => RegLocation::Switch(SwitchSlot::R15),
                16 => RegLocation::Trap(TrapSlot::R16),
                17 => RegLocation::Trap(TrapSlot::R17),
                18 => RegLocation::Trap(TrapSlot::R18),
                19 => RegLocation::Trap(TrapSlot::R19),
                20 => RegLocation::Trap(TrapSlot::R20),
                21 => RegLocation::Trap(TrapSlot::R21),
                22 => RegLocation::Trap(TrapSlot::R22),
                23 => RegLocation::Trap(TrapSlot::R23),
                24 => RegLocation::Trap(TrapSlot::R24),
                25 => RegLocation::Trap(TrapSlot::R25),
                26 => RegLocation::Trap(TrapSlot::R26),
                27 => RegLocation::Trap(TrapSlot::R27),
                28 => RegLocation::Trap(TrapSlot::R28),
                29 => RegLocation::Trap(TrapSlot::Gp),
                _ => RegLocation::Zero,
            },
            Register::Fpr(n) => RegLocation::Switch(SwitchSlot::Fp(n)),
            Register::Fpcr => RegLocation::Switch(SwitchSlot::Fp(31)),
            Register::Pc => RegLocation::Trap(TrapSlot::Pc),
            Register::UserSp => RegLocation::UserSp,
            Register::Unique => RegLocation::Unique,
            Register::Zero => RegLocation::Zero,
        }
    }

    /// 表示用のレジスタ名
    pub fn name(self) -> String {
        match self {
            Register::Gpr(29) => "gp".to_string(),
            Register::Gpr(n) => format!("r{}", n),
            Register::UserSp => "sp".to_string(),
            Register::Zero => "zero".to_string(),
            Register::Fpr(n) => format!("f{}", n),
            Register::Fpcr => "fpcr".to_string(),
            Register::Pc => "pc".to_string(),
            Register::Unique => "unique".to_string(),
        }
    }
}

impl From<u64> for Register {
    fn from(index: u64) -> Self {
        Register::from_index(index)
    }
}
