//! REPLコマンド

/// REPLコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 全レジスタ表示
    Regs,
    /// レジスタ1つを表示
    Reg(String),
    /// レジスタに書き込む
    Set(String, String),
    /// メモリの命令語を表示
    Examine(String),
    /// メモリに命令語を書き込む
    Poke(String, String),
    /// シングルステップを要求してブレークポイントを設置
    Step,
    /// ブレークポイントを設置（要求済みのステップを実行）
    Arm,
    /// ブレークポイントを取り除く
    Cancel,
    /// ステップ状態を表示
    State,
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        match (parts[0], &parts[1..]) {
            ("regs" | "info", []) => Some(Command::Regs),
            ("reg" | "p", [reg]) => Some(Command::Reg(reg.to_string())),
            ("set", [reg, value]) => Some(Command::Set(reg.to_string(), value.to_string())),
            ("x", [addr]) => Some(Command::Examine(addr.to_string())),
            ("poke", [addr, value]) => Some(Command::Poke(addr.to_string(), value.to_string())),
            ("step" | "s", []) => Some(Command::Step),
            ("arm", []) => Some(Command::Arm),
            ("cancel", []) => Some(Command::Cancel),
            ("state", []) => Some(Command::State),
            ("help" | "h" | "?", []) => Some(Command::Help),
            ("quit" | "q" | "exit", []) => Some(Command::Quit),
            _ => None,
        }
    }
}
