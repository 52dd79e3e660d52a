//! alstep ターゲットモデル
//!
//! このクレートは、停止中のトレース対象を表す低レベルのモデルを提供します。
//! 保存レジスタコンテキスト、レジスタ番号の解決、アドレス空間アクセス、
//! ソフトウェアブレークポイントなどを扱います。

pub mod breakpoint;
pub mod context;
pub mod errors;
pub mod fpu;
pub mod memory;
pub mod registers;
pub mod task;
pub mod thread;

pub use breakpoint::{SoftwareBreakpoint, BREAKINST};
pub use context::{SwitchFrame, SwitchSlot, TrapFrame, TrapSlot};
pub use errors::TraceError;
pub use fpu::CpuModel;
pub use memory::{AddressSpace, MemoryExt, ProcessMemory, SparseMemory};
pub use registers::{RegLocation, Register};
pub use task::Task;
pub use thread::{Pcb, StepState, ThreadId, ThreadInfo};

/// ターゲットアクセスの結果型
pub type Result<T> = std::result::Result<T, TraceError>;
