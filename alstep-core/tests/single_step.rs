//! シングルステップとレジスタアクセスの統合テスト

use alstep_core::decode::encode;
use alstep_core::{
    arm_single_step, cancel_single_step, disable_single_step, read_register, write_register,
    TraceError,
};
use alstep_target::fpu::{ieee_swcr_to_fpcr, FPCR_DYN_MINUS, IEEE_STATUS_UNF, IEEE_TRAP_ENABLE_DZE};
use alstep_target::{
    MemoryExt, SoftwareBreakpoint, SparseMemory, StepState, Task, BREAKINST,
};

/// bis $31,$31,$31
const NOP: u32 = 0x47ff_041f;
/// addq $1,$2,$3
const ADDQ: u32 = 0x4022_0403;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// `pc` から命令列を配置したタスクを作成する
fn task_with_code(pc: u64, words: &[u32]) -> Task<SparseMemory> {
    init_tracing();
    let mut mem = SparseMemory::new();
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    mem.load(pc, &bytes, true);
    let mut task = Task::new(42, mem);
    task.set_pc(pc);
    task
}

#[test]
fn test_register_write_read_round_trip() {
    let mut task = task_with_code(0x1000, &[NOP]);

    for regno in 0..=65u64 {
        let value = 0xa5a5_0000_0000_0000 | regno;
        write_register(&mut task, regno, value).unwrap();
        let read = read_register(&task, regno);
        match regno {
            31 => assert_eq!(read, 0),
            63 => {}
            _ => assert_eq!(read, value, "reg {}", regno),
        }
    }
}

#[test]
fn test_fpcr_reads_back_derived_control_bits() {
    let mut task = task_with_code(0x1000, &[NOP]);
    let sw = IEEE_TRAP_ENABLE_DZE | IEEE_STATUS_UNF;

    write_register(&mut task, 63, FPCR_DYN_MINUS | sw).unwrap();

    // 書いた値そのものではなく、動的丸めモード | 導出した制御ビット | swcr
    let expected = FPCR_DYN_MINUS | ieee_swcr_to_fpcr(sw) | sw;
    assert_eq!(read_register(&task, 63), expected);
}

#[test]
fn test_sequential_instruction_end_to_end() {
    let mut task = task_with_code(0x1000, &[ADDQ, NOP]);

    assert_eq!(arm_single_step(&mut task).unwrap(), 1);
    let bps = task.thread.step.breakpoints();
    assert_eq!(bps.len(), 1);
    assert_eq!(bps[0].address(), 0x1004);
    assert_eq!(bps[0].original_insn(), NOP);
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), BREAKINST);
    // PCの命令は書き換えない
    assert_eq!(task.memory.read_u32(0x1000).unwrap(), ADDQ);

    assert!(cancel_single_step(&mut task));
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
    assert_eq!(task.thread.step, StepState::Idle);
}

#[test]
fn test_branch_with_zero_displacement_uses_one_slot() {
    let mut task = task_with_code(0x1000, &[encode::branch(0x30, 31, 0), NOP]);

    assert_eq!(arm_single_step(&mut task).unwrap(), 1);
    let bps = task.thread.step.breakpoints();
    assert_eq!(bps.len(), 1);
    assert_eq!(bps[0].address(), 0x1004);
}

#[test]
fn test_branch_arms_both_outcomes() {
    // beq $1, +4 命令
    let mut words = vec![encode::branch(0x39, 1, 4), NOP];
    words.extend([NOP; 4]);
    let mut task = task_with_code(0x1000, &words);

    assert_eq!(arm_single_step(&mut task).unwrap(), 2);
    let addrs: Vec<u64> = task
        .thread
        .step
        .breakpoints()
        .iter()
        .map(|bp| bp.address())
        .collect();
    assert_eq!(addrs, vec![0x1004, 0x1014]);
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), BREAKINST);
    assert_eq!(task.memory.read_u32(0x1014).unwrap(), BREAKINST);

    assert!(cancel_single_step(&mut task));
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
    assert_eq!(task.memory.read_u32(0x1014).unwrap(), NOP);
}

#[test]
fn test_indirect_jump_targets_base_register() {
    // ret $31,($26),1
    let mut task = task_with_code(0x1000, &[encode::jump(31, 26, 1), NOP]);
    task.memory.load(0x2000, &ADDQ.to_le_bytes(), true);
    write_register(&mut task, 26, 0x2000).unwrap();

    assert_eq!(arm_single_step(&mut task).unwrap(), 1);
    let bps = task.thread.step.breakpoints();
    assert_eq!(bps[0].address(), 0x2000);
    assert_eq!(bps[0].original_insn(), ADDQ);
    assert_eq!(task.memory.read_u32(0x2000).unwrap(), BREAKINST);
    // フォールスルー先には置かない
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
}

#[test]
fn test_jump_through_switch_frame_register() {
    // jmp $31,($9) - r9はスイッチフレームに保存されている
    let mut task = task_with_code(0x1000, &[encode::jump(31, 9, 0)]);
    task.memory.load(0x3000, &NOP.to_le_bytes(), true);
    task.switch.r9 = 0x3000;

    assert_eq!(arm_single_step(&mut task).unwrap(), 1);
    assert_eq!(task.thread.step.breakpoints()[0].address(), 0x3000);
}

#[test]
fn test_cancel_without_pending_is_noop() {
    let mut task = task_with_code(0x1000, &[NOP, NOP]);
    assert!(!cancel_single_step(&mut task));
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
}

#[test]
fn test_fetch_failure_at_pc_installs_nothing() {
    let mut task = task_with_code(0x1000, &[NOP]);
    task.set_pc(0x9000);

    let err = arm_single_step(&mut task).unwrap_err();
    assert!(matches!(err, TraceError::ShortCopy { addr: 0x9000, .. }));
    assert_eq!(task.thread.step, StepState::Idle);
    assert!(!cancel_single_step(&mut task));
}

#[test]
fn test_cancel_twice_is_safe() {
    let mut task = task_with_code(0x1000, &[NOP, NOP]);
    arm_single_step(&mut task).unwrap();

    assert!(cancel_single_step(&mut task));
    // 2回目は何もしない（他者が書いた内容を上書きしない）
    task.memory.write_u32(0x1004, ADDQ).unwrap();
    assert!(!cancel_single_step(&mut task));
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), ADDQ);
}

#[test]
fn test_unreadable_branch_target_keeps_installed_breakpoint() {
    // br +0x4000 命令。分岐先のページは未マッピング
    let mut task = task_with_code(0x1000, &[encode::branch(0x30, 31, 0x1000), NOP]);

    let err = arm_single_step(&mut task).unwrap_err();
    assert!(matches!(err, TraceError::ShortCopy { addr: 0x5004, .. }));

    // フォールスルー先のブレークポイントは記録されたまま
    assert_eq!(task.thread.step.breakpoints().len(), 1);
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), BREAKINST);

    assert!(cancel_single_step(&mut task));
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
}

#[test]
fn test_readonly_target_reports_error() {
    let mut task = task_with_code(0x1000, &[ADDQ]);
    task.memory.load(0x1004, &NOP.to_le_bytes(), false);

    assert!(arm_single_step(&mut task).is_err());
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);

    // 書き戻しの失敗は報告されない
    assert!(cancel_single_step(&mut task));
    assert_eq!(task.thread.step, StepState::Idle);
}

#[test]
fn test_overlong_pending_list_is_clamped() {
    let mut task = task_with_code(0x1000, &[NOP, NOP, NOP, NOP]);
    let bps: Vec<SoftwareBreakpoint> = [0x1004, 0x1008, 0x100c]
        .iter()
        .map(|&addr| SoftwareBreakpoint::fetch(&mut task.memory, addr).unwrap())
        .collect();
    for bp in &bps {
        bp.install(&mut task.memory).unwrap();
    }
    task.thread.step = StepState::Pending(bps);

    assert!(cancel_single_step(&mut task));
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
    assert_eq!(task.memory.read_u32(0x1008).unwrap(), NOP);
    // 3つ目は書き戻されない
    assert_eq!(task.memory.read_u32(0x100c).unwrap(), BREAKINST);
}

#[test]
fn test_disable_equals_cancel() {
    let mut task = task_with_code(0x1000, &[NOP, NOP]);
    arm_single_step(&mut task).unwrap();
    disable_single_step(&mut task);
    assert_eq!(task.memory.read_u32(0x1004).unwrap(), NOP);
    assert_eq!(task.thread.step, StepState::Idle);
}
