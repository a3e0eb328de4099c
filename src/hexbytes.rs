// 16進数バイト列の解析と整形
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::hex_digit1;
use nom::combinator::{all_consuming, map_res, opt};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexTokenError {
    #[error(r#"invalid hex token "{0}""#)]
    InvalidToken(String),
}

// 8ビット16進数(任意桁, 0x接頭辞は任意)
fn u8_hex_digit(input: &str) -> nom::IResult<&str, u8> {
    let prefix = opt(alt((tag("0x"), tag("0X"))));
    map_res((prefix, hex_digit1), |(_prefix, hexd): (Option<&str>, &str)| {
        u8::from_str_radix(hexd, 16)
    })
    .parse(input)
}

/// 1トークンを1バイトとして解析する
pub fn hex_byte(token: &str) -> Result<u8, HexTokenError> {
    all_consuming(u8_hex_digit)
        .parse(token)
        .map(|(_rest, n)| n)
        .map_err(|_| HexTokenError::InvalidToken(token.to_owned()))
}

/// 空白区切りの16進数トークン列を解析する
///
/// 連続した空白で生じる空トークンは読み飛ばす。
/// `max_bytes`個を得たらそれ以降のトークンは見ない。
/// 不正なトークンがあればその時点で失敗する。
pub fn parse_hex_bytes(args: &str, max_bytes: usize) -> Result<Vec<u8>, HexTokenError> {
    args.split(' ')
        .filter(|token| !token.is_empty())
        .take(max_bytes)
        .map(hex_byte)
        .collect()
}

/// 2桁大文字16進数の空白区切りにする
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|n| format!("{:02X}", n))
        .collect::<Vec<String>>()
        .join(" ")
}

#[test]
fn test1() {
    assert_eq!(hex_byte("00"), Ok(0x00));
    assert_eq!(hex_byte("7f"), Ok(0x7f));
    assert_eq!(hex_byte("FF"), Ok(0xff));
    assert_eq!(hex_byte("a"), Ok(0x0a));
    assert_eq!(hex_byte("0x1B"), Ok(0x1b));
    assert_eq!(hex_byte("00FF"), Ok(0xff));

    let invalid = |s: &str| Err(HexTokenError::InvalidToken(s.to_owned()));
    assert_eq!(hex_byte("zz"), invalid("zz"));
    assert_eq!(hex_byte("1g"), invalid("1g"));
    assert_eq!(hex_byte("100"), invalid("100"));
    assert_eq!(hex_byte("0x"), invalid("0x"));
    assert_eq!(hex_byte("-1"), invalid("-1"));
    assert_eq!(hex_byte(""), invalid(""));
}

#[test]
fn test2() {
    assert_eq!(parse_hex_bytes("01 02 03", 32), Ok(vec![1, 2, 3]));
    // 連続した空白は数えない
    assert_eq!(parse_hex_bytes("  01   02 ", 32), Ok(vec![1, 2]));
    assert_eq!(parse_hex_bytes("", 32), Ok(vec![]));
    assert_eq!(parse_hex_bytes("   ", 32), Ok(vec![]));
    // 上限を超えた分は無視する
    assert_eq!(parse_hex_bytes("0A 0B 0C", 2), Ok(vec![0x0a, 0x0b]));
    assert_eq!(parse_hex_bytes("0A 0B zz", 2), Ok(vec![0x0a, 0x0b]));
}

#[test]
fn test3() {
    assert_eq!(
        parse_hex_bytes("01 gg 03", 32),
        Err(HexTokenError::InvalidToken("gg".to_owned()))
    );
    // タブは区切り文字ではない
    assert_eq!(
        parse_hex_bytes("01\t02", 32),
        Err(HexTokenError::InvalidToken("01\t02".to_owned()))
    );
    assert_eq!(
        HexTokenError::InvalidToken("gg".to_owned()).to_string(),
        r#"invalid hex token "gg""#
    );
}

#[test]
fn test4() {
    assert_eq!(format_hex_bytes(&[0x0a, 0xff, 0x00, 0x1b]), "0A FF 00 1B");
    assert_eq!(format_hex_bytes(&[]), "");

    for n in 0..=u8::MAX {
        let s = format_hex_bytes(&[n]);
        assert_eq!(s.len(), 2);
        assert_eq!(hex_byte(&s), Ok(n));
    }
}
