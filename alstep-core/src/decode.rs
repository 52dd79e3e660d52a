//! 命令の制御転送分類
//!
//! シングルステップに必要なのは、次に実行される命令のアドレス候補だけです。
//! そのため命令は {分岐, 間接ジャンプ, その他} の3種類にだけ分類します。

use std::fmt;

/// オペコードがこの値以上なら分岐命令（br, bsr, fbxx, bxx）
pub const BRANCH_OPCODE_MIN: u32 = 0x30;

/// 間接ジャンプ命令（jmp, jsr, ret, jsr_coroutine）のオペコード
pub const JUMP_OPCODE: u32 = 0x1a;

/// 命令語
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

/// 制御転送の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    /// 条件・無条件分岐（変位はバイト単位）
    Branch { displacement: i64 },
    /// Rbレジスタの値へのジャンプ
    Jump { rb: u8 },
    /// 次の命令へ進む
    Sequential,
}

impl Instruction {
    /// オペコード（ビット31:26）
    pub fn opcode(self) -> u32 {
        self.0 >> 26
    }

    /// Raフィールド（ビット25:21）
    pub fn ra(self) -> u8 {
        ((self.0 >> 21) & 0x1f) as u8
    }

    /// Rbフィールド（ビット20:16）
    pub fn rb(self) -> u8 {
        ((self.0 >> 16) & 0x1f) as u8
    }

    /// 分岐変位（ビット20:0を符号拡張し、4倍したバイト数）
    pub fn branch_displacement(self) -> i64 {
        (((self.0 << 11) as i32) >> 9) as i64
    }

    /// 制御転送の種類を分類する
    pub fn control_flow(self) -> ControlFlow {
        match self.opcode() {
            op if op >= BRANCH_OPCODE_MIN => ControlFlow::Branch {
                displacement: self.branch_displacement(),
            },
            JUMP_OPCODE => ControlFlow::Jump { rb: self.rb() },
            _ => ControlFlow::Sequential,
        }
    }
}

/// REPLの `x` 出力用の表示（オペコード、Ra、Rb、分類）
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op={:#04x} ra=r{} rb=r{} ", self.opcode(), self.ra(), self.rb())?;
        match self.control_flow() {
            ControlFlow::Branch { displacement } => {
                let sign = if displacement < 0 { '-' } else { '+' };
                write!(f, "branch {}{:#x}", sign, displacement.unsigned_abs())
            }
            ControlFlow::Jump { rb } => write!(f, "jump via r{}", rb),
            ControlFlow::Sequential => write!(f, "sequential"),
        }
    }
}

impl From<u32> for Instruction {
    fn from(word: u32) -> Self {
        Instruction(word)
    }
}

/// 命令語を組み立てるヘルパー
pub mod encode {
    use super::{BRANCH_OPCODE_MIN, JUMP_OPCODE};

    /// 分岐形式（opcode, Ra, 21ビット変位）
    ///
    /// `disp` は命令数単位の変位です。
    pub fn branch(opcode: u32, ra: u8, disp: i32) -> u32 {
        debug_assert!(opcode >= BRANCH_OPCODE_MIN);
        (opcode << 26) | ((ra as u32 & 0x1f) << 21) | (disp as u32 & 0x1f_ffff)
    }

    /// メモリ形式のジャンプ（jmp/jsr/ret）
    pub fn jump(ra: u8, rb: u8, hint: u16) -> u32 {
        (JUMP_OPCODE << 26)
            | ((ra as u32 & 0x1f) << 21)
            | ((rb as u32 & 0x1f) << 16)
            | (hint as u32 & 0x3fff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// br $31, +0（何もしない分岐）
    const BR_ZERO: u32 = 0xc3e0_0000;
    /// bis $31,$31,$31（nop）
    const NOP: u32 = 0x47ff_041f;
    /// ret $31,($26),1
    const RET: u32 = 0x6bfa_8001;

    #[test]
    fn test_classify_sequential() {
        assert_eq!(Instruction(NOP).control_flow(), ControlFlow::Sequential);
        assert_eq!(Instruction(0).control_flow(), ControlFlow::Sequential);
    }

    #[test]
    fn test_classify_ret_as_jump() {
        assert_eq!(Instruction(RET).opcode(), JUMP_OPCODE);
        assert_eq!(Instruction(RET).control_flow(), ControlFlow::Jump { rb: 26 });
    }

    #[test]
    fn test_branch_displacement_sign_extension() {
        assert_eq!(
            Instruction(BR_ZERO).control_flow(),
            ControlFlow::Branch { displacement: 0 }
        );
        assert_eq!(Instruction(encode::branch(0x30, 31, 3)).branch_displacement(), 12);
        assert_eq!(Instruction(encode::branch(0x39, 1, -1)).branch_displacement(), -4);
        assert_eq!(
            Instruction(encode::branch(0x3d, 1, -(1 << 20))).branch_displacement(),
            -(1 << 22)
        );
        assert_eq!(
            Instruction(encode::branch(0x3d, 1, (1 << 20) - 1)).branch_displacement(),
            ((1 << 20) - 1) * 4
        );
    }

    #[test]
    fn test_display_shows_fields_and_class() {
        assert_eq!(Instruction(RET).to_string(), "op=0x1a ra=r31 rb=r26 jump via r26");
        assert_eq!(
            Instruction(encode::branch(0x39, 1, -1)).to_string(),
            "op=0x39 ra=r1 rb=r31 branch -0x4"
        );
        assert_eq!(Instruction(NOP).to_string(), "op=0x11 ra=r31 rb=r31 sequential");
    }

    #[test]
    fn test_field_accessors() {
        let insn = Instruction(encode::jump(26, 27, 0));
        assert_eq!(insn.ra(), 26);
        assert_eq!(insn.rb(), 27);
        assert_eq!(insn.opcode(), JUMP_OPCODE);
    }
}
