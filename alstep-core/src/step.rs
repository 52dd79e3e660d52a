//! ブレークポイントによるシングルステップ
//!
//! Alphaにはハードウェアのシングルステップトラップがありません。
//! 次に実行されうるすべてのアドレスに `call_pal bpt` を書き込んでから
//! トレース対象を再開し、停止後に元の命令語を書き戻します。
//!
//! 分岐命令は分岐するかどうかを評価せず、フォールスルー先と分岐先の
//! 両方にブレークポイントを置きます。

use crate::decode::{ControlFlow, Instruction};
use crate::regs::read_register;
use crate::Result;
use alstep_target::registers::REG_PC;
use alstep_target::{AddressSpace, MemoryExt, SoftwareBreakpoint, StepState, Task};
use tracing::{debug, warn};

/// 1回のステップで設置するブレークポイントの最大数
pub const MAX_STEP_BREAKPOINTS: usize = 2;

/// 次の命令の後続アドレス候補を計算する
///
/// 命令フェッチに失敗した場合はエラーを返します。
pub fn successors<M: AddressSpace>(task: &mut Task<M>) -> Result<Vec<u64>> {
    let pc = read_register(task, REG_PC);
    let insn = Instruction(task.memory.read_u32(pc)?);
    let next = pc.wrapping_add(4);

    let targets = match insn.control_flow() {
        ControlFlow::Branch { displacement } => {
            debug!("execing branch at {:#x}", pc);
            let mut targets = vec![next];
            // 変位ゼロは最適化されていないコードで現れる
            if displacement != 0 {
                targets.push(next.wrapping_add_signed(displacement));
            }
            targets
        }
        ControlFlow::Jump { rb } => {
            debug!("execing jump at {:#x} via ${}", pc, rb);
            vec![read_register(task, rb as u64)]
        }
        ControlFlow::Sequential => {
            debug!("execing normal insn at {:#x}", pc);
            vec![next]
        }
    };
    Ok(targets)
}

/// シングルステップ用のブレークポイントを設置する
///
/// 成功すると設置したブレークポイント数を返します。
/// PCでの命令フェッチに失敗した場合は何も設置しません。
/// 後続アドレスでの読み書きに失敗した場合は、それまでに設置したブレークポイントを
/// 記録したままエラーを返すので、[`cancel_single_step`] で書き戻せます。
pub fn arm_single_step<M: AddressSpace>(task: &mut Task<M>) -> Result<usize> {
    let targets = successors(task)?;

    if !task.thread.step.breakpoints().is_empty() {
        warn!(
            "arm_single_step: tid {} already has {} breakpoints pending",
            task.tid(),
            task.thread.step.breakpoints().len()
        );
    }

    let mut installed = Vec::with_capacity(targets.len());
    let mut result = Ok(());
    for addr in targets {
        let bp = match SoftwareBreakpoint::fetch(&mut task.memory, addr) {
            Ok(bp) => bp,
            Err(e) => {
                result = Err(e);
                break;
            }
        };
        debug!("    -> next_pc={:#x}", addr);
        // 書き込みが一部だけ成功している可能性があるので、失敗しても記録する
        installed.push(bp);
        if let Err(e) = bp.install(&mut task.memory) {
            result = Err(e);
            break;
        }
    }

    let count = installed.len();
    if count > 0 {
        task.thread.step = StepState::Pending(installed);
    }
    result.map(|()| count)
}

/// シングルステップのブレークポイントを取り除く
///
/// ステップ中だった場合（ブレークポイント設置済み、またはステップ要求済み）は
/// `true` を返します。書き戻しの失敗は無視します。
pub fn cancel_single_step<M: AddressSpace>(task: &mut Task<M>) -> bool {
    let state = std::mem::take(&mut task.thread.step);
    let stepping = state.is_stepping();

    let mut bps = state.breakpoints();
    if bps.len() > MAX_STEP_BREAKPOINTS {
        // TODO: 上限超過は二重armの痕跡なので、再開経路側で検出してエラーにする
        warn!(
            "cancel_single_step: bogus breakpoint count {} for tid {}",
            bps.len(),
            task.tid()
        );
        bps = &bps[..MAX_STEP_BREAKPOINTS];
    }

    for bp in bps {
        if let Err(e) = bp.remove(&mut task.memory) {
            debug!("failed to restore insn at {:#x}: {}", bp.address(), e);
        }
    }
    stepping
}

/// シングルステップを要求する
///
/// メモリは変更しません。命令の書き換えは再開時の [`arm_single_step`] で行います。
pub fn enable_single_step<M: AddressSpace>(task: &mut Task<M>) {
    task.thread.step = StepState::SingleStepArmed;
}

/// シングルステップを解除する
pub fn disable_single_step<M: AddressSpace>(task: &mut Task<M>) {
    cancel_single_step(task);
}

/// デタッチ時に呼ばれる
///
/// シングルステップのブレークポイントが残らないようにします。
pub fn ptrace_disable<M: AddressSpace>(task: &mut Task<M>) {
    disable_single_step(task);
}

/// シングルステップ中かどうか
pub fn is_single_stepping<M: AddressSpace>(task: &Task<M>) -> bool {
    task.thread.step.is_stepping()
}

/// 設置済みのブレークポイントを取得する
pub fn pending_breakpoints<M: AddressSpace>(task: &Task<M>) -> &[SoftwareBreakpoint] {
    task.thread.step.breakpoints()
}
