// シリアル出力
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use std::io;

/// デバッグ出力の印
pub const DEBUG_TAG: &str = "[DBG] ";

/// 行末
pub const LINE_ENDING: &str = "\r\n";

/// 出力先
///
/// 主出力はそのまま1行ずつ書き、診断出力は物理行ごとに [`DEBUG_TAG`] をつける。
/// デバッグ表示を切っていても、強制の診断出力と主出力は書く。
pub struct Console<W> {
    writer: W,
    debug: bool,
}

impl<W: io::Write> Console<W> {
    pub fn new(writer: W) -> Self {
        Console {
            writer,
            debug: true,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// 主出力
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        self.write_lines("", text)
    }

    /// 診断出力(デバッグ表示のときだけ)
    pub fn debug(&mut self, message: &str) -> io::Result<()> {
        if self.debug {
            self.debug_forced(message)
        } else {
            Ok(())
        }
    }

    /// 診断出力(常に)
    pub fn debug_forced(&mut self, message: &str) -> io::Result<()> {
        self.write_lines(DEBUG_TAG, message)
    }

    fn write_lines(&mut self, prefix: &str, text: &str) -> io::Result<()> {
        let mut buf = String::new();
        if text.is_empty() {
            buf.push_str(prefix);
            buf.push_str(LINE_ENDING);
        }
        for line in text.lines() {
            buf.push_str(prefix);
            buf.push_str(line);
            buf.push_str(LINE_ENDING);
        }
        tracing::trace!(target:"Tx->", "{}", buf.escape_debug());
        self.writer.write_all(buf.as_bytes())?;
        self.writer.flush()
    }
}

#[cfg(test)]
fn output(console: &Console<Vec<u8>>) -> &str {
    std::str::from_utf8(console.get_ref()).unwrap()
}

#[test]
fn test1() {
    let mut console = Console::new(Vec::new());
    console.print("0A FF 00 1B").unwrap();
    console.debug("Address set to 0x42").unwrap();
    console.debug("first\nsecond").unwrap();
    assert_eq!(
        output(&console),
        "0A FF 00 1B\r\n[DBG] Address set to 0x42\r\n[DBG] first\r\n[DBG] second\r\n"
    );
}

#[test]
fn test2() {
    let mut console = Console::new(Vec::new()).with_debug(false);
    console.debug("hidden").unwrap();
    console.debug_forced("Error: no bytes provided").unwrap();
    console.print("01 02").unwrap();
    assert_eq!(
        output(&console),
        "[DBG] Error: no bytes provided\r\n01 02\r\n"
    );
}
