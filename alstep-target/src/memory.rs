//! トレース対象のアドレス空間アクセス

use crate::{Result, TraceError};
use nix::unistd::Pid;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read as _, Seek, SeekFrom, Write as _};
use std::path::Path;
use tracing::{debug, trace};

/// トレース対象のページサイズ（Alphaは8KiB）
pub const PAGE_SIZE: u64 = 8192;

/// トレース対象のアドレス空間
///
/// トレーサとトレース対象の間でバイト列をコピーします。
/// 戻り値は実際に転送できたバイト数で、要求より少なければ失敗とみなします。
pub trait AddressSpace {
    /// `addr` から `buf.len()` バイトを読み取り、転送できたバイト数を返す
    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> usize;

    /// `addr` に `data` を書き込み、転送できたバイト数を返す
    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> usize;
}

impl<T: AddressSpace + ?Sized> AddressSpace for Box<T> {
    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> usize {
        (**self).read_bytes(addr, buf)
    }

    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> usize {
        (**self).write_bytes(addr, data)
    }
}

/// 完全転送を要求する型付きアクセス
///
/// 要求バイト数を転送できなかった場合は `TraceError::ShortCopy` を返します。
/// 部分的に組み立てた値を返すことはありません。
pub trait MemoryExt: AddressSpace {
    /// バイト列を完全に読み取る
    fn read_exact_at(&mut self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let copied = self.read_bytes(addr, buf);
        if copied != buf.len() {
            return Err(TraceError::short_copy(addr, buf.len(), copied));
        }
        Ok(())
    }

    /// バイト列を完全に書き込む
    fn write_all_at(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let copied = self.write_bytes(addr, data);
        if copied != data.len() {
            return Err(TraceError::short_copy(addr, data.len(), copied));
        }
        Ok(())
    }

    /// u32値（命令語）を読み取る（リトルエンディアン）
    fn read_u32(&mut self, addr: u64) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_exact_at(addr, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// u32値（命令語）を書き込む（リトルエンディアン）
    fn write_u32(&mut self, addr: u64, value: u32) -> Result<()> {
        self.write_all_at(addr, &value.to_le_bytes())
    }

    /// u64値を読み取る（リトルエンディアン）
    fn read_u64(&mut self, addr: u64) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_exact_at(addr, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// u64値を書き込む（リトルエンディアン）
    fn write_u64(&mut self, addr: u64, value: u64) -> Result<()> {
        self.write_all_at(addr, &value.to_le_bytes())
    }
}

impl<T: AddressSpace + ?Sized> MemoryExt for T {}

struct Page {
    data: Box<[u8]>,
    writable: bool,
}

/// ページ単位の疎なアドレス空間
///
/// プロセス内に保持するメモリイメージです。未マッピング領域と書き込み禁止
/// ページを持てるため、コピー失敗の経路も再現できます。
#[derive(Default)]
pub struct SparseMemory {
    pages: BTreeMap<u64, Page>,
}

impl SparseMemory {
    /// 空のアドレス空間を作成する
    pub fn new() -> Self {
        Self::default()
    }

    fn page_base(addr: u64) -> u64 {
        addr & !(PAGE_SIZE - 1)
    }

    fn page_range(addr: u64, len: u64) -> impl Iterator<Item = u64> {
        let start = Self::page_base(addr);
        let end = addr.saturating_add(len);
        (start..end).step_by(PAGE_SIZE as usize)
    }

    /// 指定範囲を覆うページをゼロ埋めでマッピングする
    ///
    /// 既にマッピング済みのページは内容を保持し、書き込み属性だけ更新します。
    pub fn map(&mut self, addr: u64, len: u64, writable: bool) {
        for base in Self::page_range(addr, len) {
            self.pages
                .entry(base)
                .and_modify(|page| page.writable = writable)
                .or_insert_with(|| Page {
                    data: vec![0u8; PAGE_SIZE as usize].into_boxed_slice(),
                    writable,
                });
        }
    }

    /// 指定範囲のマッピングを解除する
    pub fn unmap(&mut self, addr: u64, len: u64) {
        for base in Self::page_range(addr, len) {
            self.pages.remove(&base);
        }
    }

    /// 指定範囲の書き込み属性を変更する
    pub fn protect(&mut self, addr: u64, len: u64, writable: bool) {
        for base in Self::page_range(addr, len) {
            if let Some(page) = self.pages.get_mut(&base) {
                page.writable = writable;
            }
        }
    }

    /// データをロードする
    ///
    /// 必要なページをマッピングしてから内容をコピーします。
    /// ロードは書き込み属性に関係なく行われます。
    pub fn load(&mut self, addr: u64, data: &[u8], writable: bool) {
        self.map(addr, data.len() as u64, writable);
        for (i, byte) in data.iter().enumerate() {
            let a = match addr.checked_add(i as u64) {
                Some(a) => a,
                None => break,
            };
            if let Some(page) = self.pages.get_mut(&Self::page_base(a)) {
                page.data[(a - Self::page_base(a)) as usize] = *byte;
            }
        }
    }

    /// ファイルの内容をロードする
    pub fn load_file<P: AsRef<Path>>(&mut self, addr: u64, path: P, writable: bool) -> Result<usize> {
        let data = std::fs::read(path)?;
        self.load(addr, &data, writable);
        Ok(data.len())
    }

    /// 指定されたアドレスがマッピングされているか
    pub fn is_mapped(&self, addr: u64) -> bool {
        self.pages.contains_key(&Self::page_base(addr))
    }
}

impl AddressSpace for SparseMemory {
    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> usize {
        for (i, out) in buf.iter_mut().enumerate() {
            let a = match addr.checked_add(i as u64) {
                Some(a) => a,
                None => return i,
            };
            match self.pages.get(&Self::page_base(a)) {
                Some(page) => *out = page.data[(a - Self::page_base(a)) as usize],
                None => return i,
            }
        }
        buf.len()
    }

    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> usize {
        for (i, byte) in data.iter().enumerate() {
            let a = match addr.checked_add(i as u64) {
                Some(a) => a,
                None => return i,
            };
            match self.pages.get_mut(&Self::page_base(a)) {
                Some(page) if page.writable => {
                    page.data[(a - Self::page_base(a)) as usize] = *byte;
                }
                _ => return i,
            }
        }
        data.len()
    }
}

/// メモリマッピング情報
#[derive(Debug, Clone)]
pub struct MemoryMapping {
    pub start: u64,
    pub end: u64,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

/// 実行中プロセスのアドレス空間
///
/// /proc/pid/mem を使ってコピーします。読み取りで EIO が返った場合は
/// PTRACE_PEEKDATA にフォールバックします（呼び出し元がトレーサである必要があります）。
pub struct ProcessMemory {
    pid: Pid,
}

impl ProcessMemory {
    /// メモリアクセスを作成する
    pub fn new(pid: i32) -> Self {
        Self {
            pid: Pid::from_raw(pid),
        }
    }

    /// プロセスIDを取得する
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// /proc/pid/mem のパスを取得する
    fn mem_path(&self) -> String {
        format!("/proc/{}/mem", self.pid)
    }

    /// /proc/pid/mem経由で読み取り、転送できたバイト数を返す
    fn read_via_proc_mem(&self, addr: u64, buf: &mut [u8]) -> Result<usize> {
        let mut file = File::open(self.mem_path())?;
        file.seek(SeekFrom::Start(addr))?;

        let mut done = 0;
        while done < buf.len() {
            match file.read(&mut buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if done == 0 => return Err(e.into()),
                Err(_) => break,
            }
        }
        Ok(done)
    }

    /// PTRACE_PEEKDATAを使用して読み取る
    ///
    /// ワード単位で読み、失敗したワードの手前までのバイト数を返します。
    fn read_via_ptrace(&self, addr: u64, buf: &mut [u8]) -> usize {
        use nix::sys::ptrace;

        let word_size = std::mem::size_of::<std::ffi::c_long>();
        let mut done = 0;

        while done < buf.len() {
            let word_addr = (addr + done as u64) as *mut std::ffi::c_void;
            let word = match ptrace::read(self.pid, word_addr) {
                Ok(word) => word,
                Err(e) => {
                    debug!("PEEKDATA failed at 0x{:x}: {}", addr + done as u64, e);
                    break;
                }
            };
            let bytes = word.to_ne_bytes();
            let copy_size = (buf.len() - done).min(word_size);
            buf[done..done + copy_size].copy_from_slice(&bytes[..copy_size]);
            done += copy_size;
        }
        done
    }

    /// /proc/pid/mem経由で書き込み、転送できたバイト数を返す
    fn write_via_proc_mem(&self, addr: u64, data: &[u8]) -> Result<usize> {
        let mut file = OpenOptions::new().write(true).open(self.mem_path())?;
        file.seek(SeekFrom::Start(addr))?;

        let mut done = 0;
        while done < data.len() {
            match file.write(&data[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if done == 0 => return Err(e.into()),
                Err(_) => break,
            }
        }
        Ok(done)
    }

    /// /proc/pid/maps を解析してメモリマッピング情報を取得する
    pub fn mappings(&self) -> Result<Vec<MemoryMapping>> {
        let file = File::open(format!("/proc/{}/maps", self.pid))?;
        let reader = BufReader::new(file);

        let mut mappings = Vec::new();
        for line in reader.lines() {
            let line = line?;
            // 例: "7f1234567000-7f1234568000 r-xp 00000000 08:01 123456 /lib/libc.so"
            let mut parts = line.split_whitespace();
            let (range, perms) = match (parts.next(), parts.next()) {
                (Some(range), Some(perms)) => (range, perms),
                _ => continue,
            };
            let (start, end) = match range.split_once('-') {
                Some((s, e)) => match (u64::from_str_radix(s, 16), u64::from_str_radix(e, 16)) {
                    (Ok(s), Ok(e)) => (s, e),
                    _ => continue,
                },
                None => continue,
            };

            mappings.push(MemoryMapping {
                start,
                end,
                readable: perms.chars().next() == Some('r'),
                writable: perms.chars().nth(1) == Some('w'),
                executable: perms.chars().nth(2) == Some('x'),
            });
        }

        Ok(mappings)
    }

    /// 指定されたアドレスが有効なメモリマッピング内にあるかチェックする
    pub fn is_mapped(&self, addr: u64) -> Result<bool> {
        let mappings = self.mappings()?;
        Ok(mappings.iter().any(|m| addr >= m.start && addr < m.end))
    }
}

impl AddressSpace for ProcessMemory {
    fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> usize {
        match self.read_via_proc_mem(addr, buf) {
            Ok(n) => n,
            Err(TraceError::Io(e)) if e.raw_os_error() == Some(nix::libc::EIO) => {
                trace!("EIO from {}, falling back to PEEKDATA", self.mem_path());
                self.read_via_ptrace(addr, buf)
            }
            Err(e) => {
                debug!("read of {} bytes at 0x{:x} failed: {}", buf.len(), addr, e);
                0
            }
        }
    }

    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> usize {
        self.write_via_proc_mem(addr, data).unwrap_or_else(|e| {
            debug!("write of {} bytes at 0x{:x} failed: {}", data.len(), addr, e);
            0
        })
    }
}
