// コマンド行
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use nom::Parser;
use nom::branch::alt;
use nom::character::complete::char;
use nom::combinator::{map, rest};
use nom::sequence::preceded;

/// 使い方
pub const USAGE: &str = "\
Usage:
  a xx          set target address (08-77)
  r xx          read xx bytes from target (01-20)
  w xx xx ...   write bytes to target (up to 32)
  xx = hex byte";

/// 先頭1文字で選ぶコマンド。中身は残りの引数文字列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    SetAddress(&'a str), // a xx
    Read(&'a str),       // r xx
    Write(&'a str),      // w xx xx ...
    Usage,               // それ以外
}

fn command(input: &str) -> nom::IResult<&str, Command<'_>> {
    alt((
        map(preceded(char('a'), rest), Command::SetAddress),
        map(preceded(char('r'), rest), Command::Read),
        map(preceded(char('w'), rest), Command::Write),
        map(rest, |_| Command::Usage),
    ))
    .parse(input)
}

impl<'a> Command<'a> {
    /// 前後の空白を除いた行から選ぶ
    pub fn from_line(line: &'a str) -> Self {
        command(line.trim())
            .map(|(_rest, command)| command)
            .unwrap_or(Command::Usage)
    }
}

#[test]
fn test1() {
    assert_eq!(Command::from_line("a 42"), Command::SetAddress(" 42"));
    assert_eq!(Command::from_line("  r 04\r\n"), Command::Read(" 04"));
    assert_eq!(Command::from_line("w 01 02 03"), Command::Write(" 01 02 03"));
    assert_eq!(Command::from_line("a42"), Command::SetAddress("42"));
    assert_eq!(Command::from_line("a"), Command::SetAddress(""));
}

#[test]
fn test2() {
    assert_eq!(Command::from_line(""), Command::Usage);
    assert_eq!(Command::from_line("   "), Command::Usage);
    assert_eq!(Command::from_line("help"), Command::Usage);
    // 大文字小文字は区別する
    assert_eq!(Command::from_line("A 42"), Command::Usage);
    assert_eq!(Command::from_line("R 04"), Command::Usage);
    assert_eq!(Command::from_line("W 01"), Command::Usage);
}
