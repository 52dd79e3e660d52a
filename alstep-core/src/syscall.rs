//! システムコールの入口・出口フック

use alstep_target::{AddressSpace, Task, TrapFrame};
use tracing::trace;

/// システムコールをスキップさせるときに返す値（-1）
pub const SKIP_SYSCALL: u64 = u64::MAX;

/// トレースフックと監査フック
///
/// 返り値の意味を解釈するのは、入口フックがシステムコールのスキップを
/// 要求できる点だけです。
pub trait TraceHooks {
    /// システムコール入口をトレーサに通知する
    ///
    /// `true` を返すとシステムコールをスキップします。
    fn report_syscall_entry(&mut self, regs: &TrapFrame) -> bool;

    /// システムコール出口をトレーサに通知する
    fn report_syscall_exit(&mut self, regs: &TrapFrame);

    /// システムコール入口の監査（番号と最初の4引数）
    fn audit_entry(&mut self, _nr: u64, _args: [u64; 4]) {}

    /// システムコール出口の監査
    fn audit_exit(&mut self, _regs: &TrapFrame) {}
}

/// システムコール入口の処理
///
/// 実行するシステムコール番号（r0）を返します。
/// トレーサがスキップを要求した場合は [`SKIP_SYSCALL`] を返します。
pub fn syscall_trace_enter<M: AddressSpace, H: TraceHooks + ?Sized>(
    task: &Task<M>,
    hooks: &mut H,
) -> u64 {
    let regs = &task.trap;
    let skip = task.thread.syscall_trace && hooks.report_syscall_entry(regs);
    hooks.audit_entry(regs.r0, [regs.r16, regs.r17, regs.r18, regs.r19]);

    if skip {
        trace!("syscall {} skipped by tracer", regs.r0);
        SKIP_SYSCALL
    } else {
        regs.r0
    }
}

/// システムコール出口の処理
pub fn syscall_trace_leave<M: AddressSpace, H: TraceHooks + ?Sized>(task: &Task<M>, hooks: &mut H) {
    hooks.audit_exit(&task.trap);
    if task.thread.syscall_trace {
        hooks.report_syscall_exit(&task.trap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alstep_target::SparseMemory;

    #[derive(Default)]
    struct Recorder {
        skip: bool,
        entries: usize,
        exits: usize,
        audited: Vec<(u64, [u64; 4])>,
        audit_exits: usize,
    }

    impl TraceHooks for Recorder {
        fn report_syscall_entry(&mut self, _regs: &TrapFrame) -> bool {
            self.entries += 1;
            self.skip
        }

        fn report_syscall_exit(&mut self, _regs: &TrapFrame) {
            self.exits += 1;
        }

        fn audit_entry(&mut self, nr: u64, args: [u64; 4]) {
            self.audited.push((nr, args));
        }

        fn audit_exit(&mut self, _regs: &TrapFrame) {
            self.audit_exits += 1;
        }
    }

    fn task() -> Task<SparseMemory> {
        let mut task = Task::new(1, SparseMemory::new());
        task.trap.r0 = 4;
        task.trap.r16 = 1;
        task.trap.r17 = 0x2000;
        task.trap.r18 = 12;
        task.trap.r19 = 0;
        task
    }

    #[test]
    fn test_enter_without_trace_flag() {
        let task = task();
        let mut hooks = Recorder { skip: true, ..Default::default() };

        assert_eq!(syscall_trace_enter(&task, &mut hooks), 4);
        assert_eq!(hooks.entries, 0);
        assert_eq!(hooks.audited, vec![(4, [1, 0x2000, 12, 0])]);
    }

    #[test]
    fn test_enter_traced_and_skipped() {
        let mut task = task();
        task.thread.syscall_trace = true;

        let mut hooks = Recorder::default();
        assert_eq!(syscall_trace_enter(&task, &mut hooks), 4);

        hooks.skip = true;
        assert_eq!(syscall_trace_enter(&task, &mut hooks), SKIP_SYSCALL);
        assert_eq!(hooks.entries, 2);
        assert_eq!(hooks.audited.len(), 2);
    }

    #[test]
    fn test_leave() {
        let mut task = task();
        let mut hooks = Recorder::default();

        syscall_trace_leave(&task, &mut hooks);
        assert_eq!((hooks.audit_exits, hooks.exits), (1, 0));

        task.thread.syscall_trace = true;
        syscall_trace_leave(&task, &mut hooks);
        assert_eq!((hooks.audit_exits, hooks.exits), (2, 1));
    }
}
