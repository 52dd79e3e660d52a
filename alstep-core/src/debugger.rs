//! トレーサのセッション

use crate::regs::{read_register, write_register};
use crate::step::{self, arm_single_step, cancel_single_step, enable_single_step};
use crate::Result;
use alstep_target::registers::{REG_FPCR, REG_PC, REG_UNIQUE};
use alstep_target::{AddressSpace, MemoryExt, Register, SoftwareBreakpoint, StepState, Task};
use tracing::debug;

/// ステップ停止の判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopKind {
    /// シングルステップのブレークポイントで停止した
    Step,
    /// ステップとは無関係のトラップ
    Other,
}

/// トレーサ
///
/// 停止中のトレース対象を1つ所有し、レジスタとシングルステップの操作を提供します。
pub struct Debugger<M> {
    task: Task<M>,
}

impl<M: AddressSpace> Debugger<M> {
    /// トレース対象を所有するデバッガを作成する
    pub fn new(task: Task<M>) -> Self {
        Self { task }
    }

    /// トレース対象を取得する
    pub fn task(&self) -> &Task<M> {
        &self.task
    }

    /// トレース対象を可変参照で取得する
    pub fn task_mut(&mut self) -> &mut Task<M> {
        &mut self.task
    }

    /// レジスタを読み取る
    pub fn read_register(&self, regno: u64) -> u64 {
        read_register(&self.task, regno)
    }

    /// レジスタに書き込む
    pub fn write_register(&mut self, regno: u64, value: u64) -> Result<()> {
        write_register(&mut self.task, regno, value)
    }

    /// 表示用に全レジスタを読み取る
    pub fn registers(&self) -> Vec<(Register, u64)> {
        (0..=REG_UNIQUE)
            .map(|regno| (Register::from_index(regno), self.read_register(regno)))
            .collect()
    }

    /// プログラムカウンタを取得する
    pub fn pc(&self) -> u64 {
        self.read_register(REG_PC)
    }

    /// FPCR（ソフトウェア状態をマージした値）を取得する
    pub fn fpcr(&self) -> u64 {
        self.read_register(REG_FPCR)
    }

    /// メモリの命令語を読み取る
    pub fn examine(&mut self, addr: u64) -> Result<u32> {
        self.task.memory.read_u32(addr)
    }

    /// メモリに命令語を書き込む
    pub fn poke(&mut self, addr: u64, value: u32) -> Result<()> {
        self.task.memory.write_u32(addr, value)
    }

    /// シングルステップを要求し、ブレークポイントを設置する
    ///
    /// 設置したブレークポイント数を返します。
    pub fn step(&mut self) -> Result<usize> {
        self.remove_pending();
        enable_single_step(&mut self.task);
        arm_single_step(&mut self.task)
    }

    /// ブレークポイントを設置する
    ///
    /// 設置済みのものが残っていれば、先に元の命令へ書き戻します。
    pub fn arm(&mut self) -> Result<usize> {
        self.remove_pending();
        arm_single_step(&mut self.task)
    }

    // Pendingのまま再設置しない
    fn remove_pending(&mut self) {
        if matches!(self.task.thread.step, StepState::Pending(_)) {
            debug!("re-arming: removing pending breakpoints first");
            cancel_single_step(&mut self.task);
        }
    }

    /// 停止後にブレークポイントを取り除き、停止の種類を判定する
    pub fn cancel(&mut self) -> StopKind {
        if cancel_single_step(&mut self.task) {
            StopKind::Step
        } else {
            StopKind::Other
        }
    }

    /// ステップ状態を取得する
    pub fn step_state(&self) -> &StepState {
        &self.task.thread.step
    }

    /// 設置済みのブレークポイント
    pub fn pending_breakpoints(&self) -> &[SoftwareBreakpoint] {
        step::pending_breakpoints(&self.task)
    }

    /// トレース対象を手放す
    ///
    /// シングルステップのブレークポイントを取り除いてからタスクを返します。
    pub fn detach(mut self) -> Task<M> {
        step::ptrace_disable(&mut self.task);
        self.task
    }
}
