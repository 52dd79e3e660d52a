//! レジスタ番号による読み書き
//!
//! トレーサからのPEEKUSR/POKEUSR相当の要求を処理します。
//! FPCR（レジスタ63）だけはハードウェア制御語とソフトウェアIEEE状態の
//! マージ・分割を行い、それ以外は保存位置を直接読み書きします。

use crate::Result;
use alstep_target::fpu::{ieee_swcr_to_fpcr, swcr_update_status, FPCR_DYN_MASK, IEEE_SW_MASK};
use alstep_target::registers::REG_FPCR;
use alstep_target::{AddressSpace, Task};
use tracing::trace;

/// レジスタを読み取る
///
/// FPCRはハードウェア制御語に、ソフトウェア状態から導いたステータスビットを
/// ORした値を返します。
pub fn read_register<M: AddressSpace>(task: &Task<M>, regno: u64) -> u64 {
    let value = if regno == REG_FPCR {
        let fpcr = task.slot(task.locate(regno));
        let swcr = task.thread.ieee_state & IEEE_SW_MASK;
        fpcr | swcr_update_status(task.thread.cpu, swcr, fpcr)
    } else {
        task.slot(task.locate(regno))
    };
    trace!("peek ${} -> {:#x}", regno, value);
    value
}

/// レジスタに書き込む
///
/// FPCRへの書き込みでは、ソフトウェア状態ビットをスレッド情報に保存し、
/// 動的丸めモードとソフトウェア状態から再構成したハードウェア制御語を格納します。
/// ゼロレジスタと範囲外の番号への書き込みは捨てられます。
pub fn write_register<M: AddressSpace>(task: &mut Task<M>, regno: u64, value: u64) -> Result<()> {
    trace!("poke ${} <- {:#x}", regno, value);
    let mut data = value;
    if regno == REG_FPCR {
        task.thread.ieee_state = (task.thread.ieee_state & !IEEE_SW_MASK) | (value & IEEE_SW_MASK);
        data = (value & FPCR_DYN_MASK) | ieee_swcr_to_fpcr(value);
    }
    let loc = task.locate(regno);
    task.store(loc, data);
    Ok(())
}
