//! ブレークポイント機能

use crate::memory::MemoryExt;
use crate::Result;

/// `call_pal bpt` 命令の符号化
pub const BREAKINST: u32 = 0x0000_0080;

/// ソフトウェアブレークポイント（call_pal bpt）
///
/// 命令語を1つ退避し、同じアドレスをトラップ命令で置き換えます。
/// 退避（fetch）と書き込み（install）を分けているので、書き込みに失敗しても
/// 退避した命令語は呼び出し元に残ります。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareBreakpoint {
    address: u64,
    original_insn: u32,
}

impl SoftwareBreakpoint {
    /// 元の命令語を読み取って退避する（メモリは変更しない）
    pub fn fetch<M: MemoryExt + ?Sized>(memory: &mut M, address: u64) -> Result<Self> {
        let original_insn = memory.read_u32(address)?;
        Ok(Self {
            address,
            original_insn,
        })
    }

    /// トラップ命令を書き込む
    pub fn install<M: MemoryExt + ?Sized>(&self, memory: &mut M) -> Result<()> {
        memory.write_u32(self.address, BREAKINST)
    }

    /// 元の命令語を書き戻す
    pub fn remove<M: MemoryExt + ?Sized>(&self, memory: &mut M) -> Result<()> {
        memory.write_u32(self.address, self.original_insn)
    }

    /// ブレークポイントのアドレスを取得する
    pub fn address(&self) -> u64 {
        self.address
    }

    /// 退避した命令語を取得する
    pub fn original_insn(&self) -> u32 {
        self.original_insn
    }
}
