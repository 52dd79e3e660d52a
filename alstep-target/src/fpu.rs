//! 浮動小数点制御状態
//!
//! FPCRの一部のビットはハードウェアに実装されておらず、IEEEトラップ許可と
//! 例外ステータスはスレッドごとのソフトウェア状態（swcr）として保持されます。
//! レジスタ63の読み書きでは両者をマージ・分割します。

/// 非正規化数の無効演算トラップ無効
pub const FPCR_DNOD: u64 = 1 << 47;
/// 非正規化数をゼロとして扱う
pub const FPCR_DNZ: u64 = 1 << 48;
/// 無効演算トラップ無効
pub const FPCR_INVD: u64 = 1 << 49;
/// ゼロ除算トラップ無効
pub const FPCR_DZED: u64 = 1 << 50;
/// オーバーフロートラップ無効
pub const FPCR_OVFD: u64 = 1 << 51;
/// 無効演算
pub const FPCR_INV: u64 = 1 << 52;
/// ゼロ除算
pub const FPCR_DZE: u64 = 1 << 53;
/// オーバーフロー
pub const FPCR_OVF: u64 = 1 << 54;
/// アンダーフロー
pub const FPCR_UNF: u64 = 1 << 55;
/// 不正確
pub const FPCR_INE: u64 = 1 << 56;
/// 整数オーバーフロー
pub const FPCR_IOV: u64 = 1 << 57;
/// アンダーフローをゼロに
pub const FPCR_UNDZ: u64 = 1 << 60;
/// アンダーフロートラップ無効
pub const FPCR_UNFD: u64 = 1 << 61;
/// 不正確トラップ無効
pub const FPCR_INED: u64 = 1 << 62;
/// サマリビット
pub const FPCR_SUM: u64 = 1 << 63;

/// 動的丸めモードの先頭ビット
pub const FPCR_DYN_SHIFT: u32 = 58;
/// 動的丸めモード: ゼロ方向
pub const FPCR_DYN_CHOPPED: u64 = 0x0 << FPCR_DYN_SHIFT;
/// 動的丸めモード: -INF方向
pub const FPCR_DYN_MINUS: u64 = 0x1 << FPCR_DYN_SHIFT;
/// 動的丸めモード: 最近接
pub const FPCR_DYN_NORMAL: u64 = 0x2 << FPCR_DYN_SHIFT;
/// 動的丸めモード: +INF方向
pub const FPCR_DYN_PLUS: u64 = 0x3 << FPCR_DYN_SHIFT;
/// 動的丸めモードのマスク
pub const FPCR_DYN_MASK: u64 = 0x3 << FPCR_DYN_SHIFT;

pub const IEEE_TRAP_ENABLE_INV: u64 = 1 << 1;
pub const IEEE_TRAP_ENABLE_DZE: u64 = 1 << 2;
pub const IEEE_TRAP_ENABLE_OVF: u64 = 1 << 3;
pub const IEEE_TRAP_ENABLE_UNF: u64 = 1 << 4;
pub const IEEE_TRAP_ENABLE_INE: u64 = 1 << 5;
pub const IEEE_TRAP_ENABLE_DNO: u64 = 1 << 6;
pub const IEEE_TRAP_ENABLE_MASK: u64 = IEEE_TRAP_ENABLE_INV
    | IEEE_TRAP_ENABLE_DZE
    | IEEE_TRAP_ENABLE_OVF
    | IEEE_TRAP_ENABLE_UNF
    | IEEE_TRAP_ENABLE_INE
    | IEEE_TRAP_ENABLE_DNO;

/// 非正規化入力をゼロに写像
pub const IEEE_MAP_DMZ: u64 = 1 << 12;
/// アンダーフロー結果をゼロに写像
pub const IEEE_MAP_UMZ: u64 = 1 << 13;
pub const IEEE_MAP_MASK: u64 = IEEE_MAP_DMZ | IEEE_MAP_UMZ;

pub const IEEE_STATUS_INV: u64 = 1 << 17;
pub const IEEE_STATUS_DZE: u64 = 1 << 18;
pub const IEEE_STATUS_OVF: u64 = 1 << 19;
pub const IEEE_STATUS_UNF: u64 = 1 << 20;
pub const IEEE_STATUS_INE: u64 = 1 << 21;
pub const IEEE_STATUS_DNO: u64 = 1 << 22;
pub const IEEE_STATUS_MASK: u64 = IEEE_STATUS_INV
    | IEEE_STATUS_DZE
    | IEEE_STATUS_OVF
    | IEEE_STATUS_UNF
    | IEEE_STATUS_INE
    | IEEE_STATUS_DNO;

/// ソフトウェア状態としてレジスタ63経由で読み書きできるビット
pub const IEEE_SW_MASK: u64 = IEEE_TRAP_ENABLE_MASK | IEEE_STATUS_MASK | IEEE_MAP_MASK;

/// CPU実装バージョン
///
/// EV6以降は例外ステータスの大半をハードウェアFPCRに持つため、
/// 読み取り時にハードウェア側のステータスをソフトウェア状態へ取り込みます。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CpuModel {
    Ev4,
    Ev5,
    #[default]
    Ev6,
}

impl std::str::FromStr for CpuModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ev4" => Ok(Self::Ev4),
            "ev5" => Ok(Self::Ev5),
            "ev6" => Ok(Self::Ev6),
            other => Err(format!("unknown CPU model '{}' (expected ev4, ev5 or ev6)", other)),
        }
    }
}

/// ソフトウェアのIEEE状態をハードウェアFPCR形式に変換する
pub fn ieee_swcr_to_fpcr(sw: u64) -> u64 {
    let mut fp = (sw & IEEE_STATUS_MASK) << 35;
    fp |= (sw & IEEE_MAP_DMZ) << 36;
    if sw & IEEE_STATUS_MASK != 0 {
        fp |= FPCR_SUM;
    }
    fp |= (!sw & (IEEE_TRAP_ENABLE_INV | IEEE_TRAP_ENABLE_DZE | IEEE_TRAP_ENABLE_OVF)) << 48;
    fp |= (!sw & (IEEE_TRAP_ENABLE_UNF | IEEE_TRAP_ENABLE_INE)) << 57;
    if sw & IEEE_MAP_UMZ != 0 {
        fp |= FPCR_UNDZ | FPCR_UNFD;
    }
    fp |= (!sw & IEEE_TRAP_ENABLE_DNO) << 41;
    fp
}

/// ハードウェアFPCRをソフトウェアのIEEE状態形式に変換する
pub fn ieee_fpcr_to_swcr(fp: u64) -> u64 {
    let mut sw = (fp >> 35) & IEEE_STATUS_MASK;
    sw |= (fp >> 36) & IEEE_MAP_DMZ;
    sw |= (!fp >> 48) & (IEEE_TRAP_ENABLE_INV | IEEE_TRAP_ENABLE_DZE | IEEE_TRAP_ENABLE_OVF);
    sw |= (!fp >> 57) & (IEEE_TRAP_ENABLE_UNF | IEEE_TRAP_ENABLE_INE);
    sw |= (fp >> 47) & IEEE_MAP_UMZ;
    sw |= (!fp >> 41) & IEEE_TRAP_ENABLE_DNO;
    sw
}

/// ハードウェアFPCRに蓄積された例外ステータスをソフトウェア状態へ取り込む
pub fn swcr_update_status(cpu: CpuModel, swcr: u64, fpcr: u64) -> u64 {
    match cpu {
        CpuModel::Ev6 => (swcr & !IEEE_STATUS_MASK) | ((fpcr >> 35) & IEEE_STATUS_MASK),
        CpuModel::Ev4 | CpuModel::Ev5 => swcr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swcr_fpcr_round_trip() {
        let sw = IEEE_TRAP_ENABLE_INV | IEEE_STATUS_DZE | IEEE_MAP_DMZ | IEEE_MAP_UMZ;
        assert_eq!(ieee_fpcr_to_swcr(ieee_swcr_to_fpcr(sw)), sw);
    }

    #[test]
    fn test_status_sets_summary_bit() {
        assert_eq!(ieee_swcr_to_fpcr(IEEE_STATUS_OVF) & FPCR_SUM, FPCR_SUM);
        assert_eq!(ieee_swcr_to_fpcr(IEEE_STATUS_OVF) & FPCR_OVF, FPCR_OVF);
        assert_eq!(ieee_swcr_to_fpcr(0) & FPCR_SUM, 0);
    }

    #[test]
    fn test_disabled_traps_set_hardware_disable_bits() {
        // トラップがすべて無効なら、対応するハードウェア無効化ビットが立つ
        let fp = ieee_swcr_to_fpcr(0);
        assert_eq!(
            fp,
            FPCR_INVD | FPCR_DZED | FPCR_OVFD | FPCR_UNFD | FPCR_INED | FPCR_DNOD
        );

        let fp = ieee_swcr_to_fpcr(IEEE_TRAP_ENABLE_MASK);
        assert_eq!(fp, 0);
    }

    #[test]
    fn test_update_status_only_on_ev6() {
        let fpcr = FPCR_INV | FPCR_INE;
        let swcr = IEEE_STATUS_OVF | IEEE_TRAP_ENABLE_DZE;

        assert_eq!(
            swcr_update_status(CpuModel::Ev6, swcr, fpcr),
            IEEE_STATUS_INV | IEEE_STATUS_INE | IEEE_TRAP_ENABLE_DZE
        );
        assert_eq!(swcr_update_status(CpuModel::Ev5, swcr, fpcr), swcr);
    }

    #[test]
    fn test_parse_cpu_model() {
        assert_eq!("EV6".parse::<CpuModel>().unwrap(), CpuModel::Ev6);
        assert_eq!("ev4".parse::<CpuModel>().unwrap(), CpuModel::Ev4);
        assert!("ev7".parse::<CpuModel>().is_err());
    }
}
