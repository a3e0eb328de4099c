// 送信終了時の状態コード
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransmissionStatus {
    Success,     // 0: 成功
    DataTooLong, // 1: 送信バッファに収まらない
    AddressNack, // 2: アドレス送信にNACK
    DataNack,    // 3: データー送信にNACK
    Other,       // 4: その他のエラー
    Unknown(u8), // 知らないコード
}

impl TransmissionStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::DataTooLong => 1,
            Self::AddressNack => 2,
            Self::DataNack => 3,
            Self::Other => 4,
            Self::Unknown(code) => *code,
        }
    }

    /// 知らないコードには説明がない
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::Success => Some("success"),
            Self::DataTooLong => Some("data too long to fit in transmit buffer"),
            Self::AddressNack => Some("received NACK on transmit of address"),
            Self::DataNack => Some("received NACK on transmit of data"),
            Self::Other => Some("other error"),
            Self::Unknown(_) => None,
        }
    }
}

impl From<u8> for TransmissionStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::DataTooLong,
            2 => Self::AddressNack,
            3 => Self::DataNack,
            4 => Self::Other,
            n => Self::Unknown(n),
        }
    }
}

impl From<TransmissionStatus> for u8 {
    fn from(status: TransmissionStatus) -> u8 {
        status.code()
    }
}

impl fmt::Display for TransmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.description() {
            Some(s) => write!(f, "{} ({})", self.code(), s),
            None => write!(f, "{}", self.code()),
        }
    }
}

#[test]
fn test1() {
    assert_eq!(TransmissionStatus::from(0), TransmissionStatus::Success);
    assert_eq!(TransmissionStatus::from(2), TransmissionStatus::AddressNack);
    assert_eq!(TransmissionStatus::from(7), TransmissionStatus::Unknown(7));
    for code in 0..=u8::MAX {
        assert_eq!(u8::from(TransmissionStatus::from(code)), code);
    }
}

#[test]
fn test2() {
    assert_eq!(
        TransmissionStatus::AddressNack.to_string(),
        "2 (received NACK on transmit of address)"
    );
    assert_eq!(
        TransmissionStatus::DataNack.to_string(),
        "3 (received NACK on transmit of data)"
    );
    assert_eq!(TransmissionStatus::Other.to_string(), "4 (other error)");
    assert_eq!(TransmissionStatus::Unknown(5).to_string(), "5");
    assert_eq!(TransmissionStatus::Success.to_string(), "0 (success)");
}
