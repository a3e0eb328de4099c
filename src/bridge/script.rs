// コマンドファイルとブリッジ応答
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::bridge::DEBUG_TAG;
use std::io::{self, BufRead};

/// コマンドファイルの1行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLine<'a> {
    pub command: &'a str,
    pub comment: Option<&'a str>,
}

/// コマンドファイルの1行を解析する
///
/// 空行はNoneになる。#以降はコメントとして取り除く。
pub fn parse_script_line(line: &str) -> Option<ScriptLine<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (command, comment) = match line.split_once('#') {
        Some((command, comment)) => (command.trim(), Some(comment.trim())),
        None => (line, None),
    };
    Some(ScriptLine {
        command,
        comment: comment.filter(|s| !s.is_empty()),
    })
}

/// ブリッジからの応答行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    Debug(&'a str),  // [DBG] 診断出力
    Output(&'a str), // 主出力
    Void,            // 空行
}

pub fn classify_response(line: &str) -> Response<'_> {
    let line = line.trim();
    if line.is_empty() {
        Response::Void
    } else if line.starts_with(DEBUG_TAG.trim_end()) {
        Response::Debug(line)
    } else {
        Response::Output(line)
    }
}

/// 応答を1行受信する
///
/// タイムアウトしたら、それまでに受信した途中の行を返す。
/// 何も受信していなければNoneを返す。
pub fn receive_response<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::<u8>::new();
    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    if buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf).into_owned();
    tracing::trace!(target:"<-Rx", "{}", line.escape_debug());
    Ok(Some(line))
}

#[test]
fn test1() {
    assert_eq!(parse_script_line(""), None);
    assert_eq!(parse_script_line("   \r\n"), None);
    assert_eq!(
        parse_script_line("a 42\n"),
        Some(ScriptLine {
            command: "a 42",
            comment: None
        })
    );
    assert_eq!(
        parse_script_line("w 00 10  # set pointer # twice"),
        Some(ScriptLine {
            command: "w 00 10",
            comment: Some("set pointer # twice")
        })
    );
    assert_eq!(
        parse_script_line("# whole line"),
        Some(ScriptLine {
            command: "",
            comment: Some("whole line")
        })
    );
    assert_eq!(
        parse_script_line("r 04 #"),
        Some(ScriptLine {
            command: "r 04",
            comment: None
        })
    );
}

#[test]
fn test2() {
    assert_eq!(
        classify_response("[DBG] Address set to 0x42\r\n"),
        Response::Debug("[DBG] Address set to 0x42")
    );
    assert_eq!(classify_response("0A FF 00 1B\r\n"), Response::Output("0A FF 00 1B"));
    assert_eq!(classify_response("\r\n"), Response::Void);
}

#[test]
fn test3() {
    // タイムアウトまでに届いた途中の行も捨てない
    use crate::bridge::dispatcher::Chunks;
    let mut reader = io::BufReader::new(Chunks::new([
        Ok("[DBG] Address set to 0x42\r\n0A F"),
        Err(io::ErrorKind::TimedOut),
        Err(io::ErrorKind::TimedOut),
    ]));
    let first = receive_response(&mut reader).unwrap().unwrap();
    assert_eq!(classify_response(&first), Response::Debug("[DBG] Address set to 0x42"));
    let partial = receive_response(&mut reader).unwrap().unwrap();
    assert_eq!(classify_response(&partial), Response::Output("0A F"));
    assert_eq!(receive_response(&mut reader).unwrap(), None);
    assert_eq!(receive_response(&mut reader).unwrap(), None);

    let mut broken = io::BufReader::new(Chunks::new([Err(io::ErrorKind::BrokenPipe)]));
    assert!(receive_response(&mut broken).is_err());
}
