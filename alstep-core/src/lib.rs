//! alstep デバッガのコア機能
//!
//! このクレートは、停止中のトレース対象に対するレジスタの読み書きと、
//! ブレークポイント方式のシングルステップを提供します。

pub mod command;
pub mod debugger;
pub mod decode;
pub mod parse;
pub mod regs;
pub mod step;
pub mod syscall;

pub use command::Command;
pub use debugger::{Debugger, StopKind};
pub use decode::{ControlFlow, Instruction};
pub use regs::{read_register, write_register};
pub use step::{
    arm_single_step, cancel_single_step, disable_single_step, enable_single_step,
    ptrace_disable,
};
pub use syscall::{syscall_trace_enter, syscall_trace_leave, TraceHooks};

// 他のクレートから使用するために再エクスポート
pub use alstep_target::{Task, TraceError};

/// コア操作の結果型
pub type Result<T> = alstep_target::Result<T>;
