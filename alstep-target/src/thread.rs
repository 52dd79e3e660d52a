//! スレッドごとの状態

use crate::breakpoint::SoftwareBreakpoint;
use crate::fpu::CpuModel;

/// スレッドID
pub type ThreadId = i32;

/// プロセス制御ブロック
///
/// トラップフレームにもスイッチフレームにも入らないユーザー状態です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pcb {
    /// ユーザースタックポインタ
    pub usp: u64,
    /// スレッド固有値（TLSポインタ）
    pub unique: u64,
}

/// シングルステップ状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepState {
    /// ステップ中でない
    #[default]
    Idle,
    /// ステップ実行が要求されたが、まだ命令を書き換えていない
    SingleStepArmed,
    /// ブレークポイントを設置済み
    Pending(Vec<SoftwareBreakpoint>),
}

impl StepState {
    /// 設置済みのブレークポイント
    pub fn breakpoints(&self) -> &[SoftwareBreakpoint] {
        match self {
            StepState::Pending(bps) => bps,
            StepState::Idle | StepState::SingleStepArmed => &[],
        }
    }

    /// ステップ中かどうか
    pub fn is_stepping(&self) -> bool {
        !matches!(self, StepState::Idle)
    }
}

/// スレッド情報
#[derive(Debug, Clone, Default)]
pub struct ThreadInfo {
    /// プロセス制御ブロック
    pub pcb: Pcb,
    /// ソフトウェアIEEE状態（下位ビットがswcr、その他はカーネル管理ビット）
    pub ieee_state: u64,
    /// CPU実装バージョン
    pub cpu: CpuModel,
    /// システムコールトレースが有効か
    pub syscall_trace: bool,
    /// シングルステップ状態
    pub step: StepState,
}
