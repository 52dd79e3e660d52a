//! 保存レジスタコンテキスト
//!
//! トレース対象が停止している間、ユーザーレジスタは2つのブロックに分かれて保存されます。
//!
//! ```text
//!  +================================+
//!  | PALcode保存フレーム             | ^
//!  | (ps, pc, gp, a0, a1, a2)       | |
//!  +================================+ | TrapFrame
//!  | SAVE_ALL で保存されるフレーム     | |
//!  |                                | v
//!  +================================+
//!  | do_switch_stack で保存される     | ^
//!  | フレーム                        | | SwitchFrame
//!  |                                | v
//!  +================================+
//! ```

/// トラップフレーム
///
/// 特権モードへの遷移（システムコール、割り込み、フォールト）のたびに自動で保存されます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub r0: u64,
    pub r1: u64,
    pub r2: u64,
    pub r3: u64,
    pub r4: u64,
    pub r5: u64,
    pub r6: u64,
    pub r7: u64,
    pub r8: u64,
    pub r19: u64,
    pub r20: u64,
    pub r21: u64,
    pub r22: u64,
    pub r23: u64,
    pub r24: u64,
    pub r25: u64,
    pub r26: u64,
    pub r27: u64,
    pub r28: u64,
    pub hae: u64,
    pub trap_a0: u64,
    pub trap_a1: u64,
    pub trap_a2: u64,
    // 以下はPALcodeが保存する
    pub ps: u64,
    pub pc: u64,
    pub gp: u64,
    pub r16: u64,
    pub r17: u64,
    pub r18: u64,
}

/// スイッチフレーム
///
/// コンテキストスイッチで自発的に実行を中断したときだけ保存されます。
/// `fp[31]` はFPCR（ハードウェア浮動小数点制御レジスタ）です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchFrame {
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub r26: u64,
    pub fp: [u64; 32],
}

/// トラップフレーム内のレジスタスロット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TrapSlot {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R16,
    R17,
    R18,
    R19,
    R20,
    R21,
    R22,
    R23,
    R24,
    R25,
    R26,
    R27,
    R28,
    Gp,
    Pc,
}

/// スイッチフレーム内のレジスタスロット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchSlot {
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    /// 浮動小数点レジスタ（0..=31、31はFPCR）
    Fp(u8),
}

impl TrapFrame {
    /// スロットの値を取得する
    pub fn get(&self, slot: TrapSlot) -> u64 {
        *self.field(slot)
    }

    /// スロットに値を設定する
    pub fn set(&mut self, slot: TrapSlot, value: u64) {
        *self.field_mut(slot) = value;
    }

    fn field(&self, slot: TrapSlot) -> &u64 {
        match slot {
            TrapSlot::R0 => &self.r0,
            TrapSlot::R1 => &self.r1,
            TrapSlot::R2 => &self.r2,
            TrapSlot::R3 => &self.r3,
            TrapSlot::R4 => &self.r4,
            TrapSlot::R5 => &self.r5,
            TrapSlot::R6 => &self.r6,
            TrapSlot::R7 => &self.r7,
            TrapSlot::R8 => &self.r8,
            TrapSlot::R16 => &self.r16,
            TrapSlot::R17 => &self.r17,
            TrapSlot::R18 => &self.r18,
            TrapSlot::R19 => &self.r19,
            TrapSlot::R20 => &self.r20,
            TrapSlot::R21 => &self.r21,
            TrapSlot::R22 => &self.r22,
            TrapSlot::R23 => &self.r23,
            TrapSlot::R24 => &self.r24,
            TrapSlot::R25 => &self.r25,
            TrapSlot::R26 => &self.r26,
            TrapSlot::R27 => &self.r27,
            TrapSlot::R28 => &self.r28,
            TrapSlot::Gp => &self.gp,
            TrapSlot::Pc => &self.pc,
        }
    }

    fn field_mut(&mut self, slot: TrapSlot) -> &mut u64 {
        match slot {
            TrapSlot::R0 => &mut self.r0,
            TrapSlot::R1 => &mut self.r1,
            TrapSlot::R2 => &mut self.r2,
            TrapSlot::R3 => &mut self.r3,
            TrapSlot::R4 => &mut self.r4,
            TrapSlot::R5 => &mut self.r5,
            TrapSlot::R6 => &mut self.r6,
            TrapSlot::R7 => &mut self.r7,
            TrapSlot::R8 => &mut self.r8,
            TrapSlot::R16 => &mut self.r16,
            TrapSlot::R17 => &mut self.r17,
            TrapSlot::R18 => &mut self.r18,
            TrapSlot::R19 => &mut self.r19,
            TrapSlot::R20 => &mut self.r20,
            TrapSlot::R21 => &mut self.r21,
            TrapSlot::R22 => &mut self.r22,
            TrapSlot::R23 => &mut self.r23,
            TrapSlot::R24 => &mut self.r24,
            TrapSlot::R25 => &mut self.r25,
            TrapSlot::R26 => &mut self.r26,
            TrapSlot::R27 => &mut self.r27,
            TrapSlot::R28 => &mut self.r28,
            TrapSlot::Gp => &mut self.gp,
            TrapSlot::Pc => &mut self.pc,
        }
    }
}

impl SwitchFrame {
    /// スロットの値を取得する
    pub fn get(&self, slot: SwitchSlot) -> u64 {
        match slot {
            SwitchSlot::R9 => self.r9,
            SwitchSlot::R10 => self.r10,
            SwitchSlot::R11 => self.r11,
            SwitchSlot::R12 => self.r12,
            SwitchSlot::R13 => self.r13,
            SwitchSlot::R14 => self.r14,
            SwitchSlot::R15 => self.r15,
            SwitchSlot::Fp(n) => self.fp[n as usize & 31],
        }
    }

    /// スロットに値を設定する
    pub fn set(&mut self, slot: SwitchSlot, value: u64) {
        match slot {
            SwitchSlot::R9 => self.r9 = value,
            SwitchSlot::R10 => self.r10 = value,
            SwitchSlot::R11 => self.r11 = value,
            SwitchSlot::R12 => self.r12 = value,
            SwitchSlot::R13 => self.r13 = value,
            SwitchSlot::R14 => self.r14 = value,
            SwitchSlot::R15 => self.r15 = value,
            SwitchSlot::Fp(n) => self.fp[n as usize & 31] = value,
        }
    }
}
