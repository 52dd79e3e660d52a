//! トレース対象タスク

use crate::context::{SwitchFrame, TrapFrame};
use crate::fpu::CpuModel;
use crate::memory::AddressSpace;
use crate::registers::{RegLocation, Register};
use crate::thread::{ThreadId, ThreadInfo};

/// 停止中のトレース対象
///
/// 保存レジスタコンテキスト、スレッド情報、アドレス空間を所有します。
/// 操作はすべて `&mut self` を取るため、1つのトレース対象を同時に
/// 2つのトレーサが操作することはありません。
pub struct Task<M> {
    tid: ThreadId,
    /// トラップフレーム
    pub trap: TrapFrame,
    /// スイッチフレーム
    pub switch: SwitchFrame,
    /// スレッド情報
    pub thread: ThreadInfo,
    /// アドレス空間
    pub memory: M,
}

impl<M: AddressSpace> Task<M> {
    /// 全レジスタがゼロのタスクを作成する
    pub fn new(tid: ThreadId, memory: M) -> Self {
        Self {
            tid,
            trap: TrapFrame::default(),
            switch: SwitchFrame::default(),
            thread: ThreadInfo::default(),
            memory,
        }
    }

    /// CPU実装バージョンを指定する
    pub fn with_cpu(mut self, cpu: CpuModel) -> Self {
        self.thread.cpu = cpu;
        self
    }

    /// スレッドIDを取得する
    pub fn tid(&self) -> ThreadId {
        self.tid
    }

    /// レジスタ番号の保存位置を取得する
    pub fn locate(&self, regno: u64) -> RegLocation {
        Register::from_index(regno).location()
    }

    /// 保存位置の値を読み取る
    pub fn slot(&self, loc: RegLocation) -> u64 {
        match loc {
            RegLocation::Trap(slot) => self.trap.get(slot),
            RegLocation::Switch(slot) => self.switch.get(slot),
            RegLocation::UserSp => self.thread.pcb.usp,
            RegLocation::Unique => self.thread.pcb.unique,
            RegLocation::Zero => 0,
        }
    }

    /// 保存位置に値を書き込む
    ///
    /// ゼロレジスタへの書き込みは捨てられます。
    pub fn store(&mut self, loc: RegLocation, value: u64) {
        match loc {
            RegLocation::Trap(slot) => self.trap.set(slot, value),
            RegLocation::Switch(slot) => self.switch.set(slot, value),
            RegLocation::UserSp => self.thread.pcb.usp = value,
            RegLocation::Unique => self.thread.pcb.unique = value,
            RegLocation::Zero => {}
        }
    }

    /// プログラムカウンタを取得する
    pub fn pc(&self) -> u64 {
        self.trap.pc
    }

    /// プログラムカウンタを設定する
    pub fn set_pc(&mut self, pc: u64) {
        self.trap.pc = pc;
    }
}
