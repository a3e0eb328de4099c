// セッション状態
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use std::fmt;

/// 7ビット周辺機器アドレス(0x08～0x77)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlaveAddress(u8);

impl SlaveAddress {
    pub const MIN: u8 = 0x08;
    pub const MAX: u8 = 0x77;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SlaveAddress {
    type Error = u8;

    /// 予約アドレスは受け付けない
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            Self::MIN..=Self::MAX => Ok(SlaveAddress(value)),
            _ => Err(value),
        }
    }
}

impl From<SlaveAddress> for u8 {
    fn from(address: SlaveAddress) -> u8 {
        address.0
    }
}

impl fmt::Display for SlaveAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// コマンドループが続くあいだの状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    selected_address: Option<SlaveAddress>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 選択中のアドレス(未設定ならNone)
    pub fn selected_address(&self) -> Option<SlaveAddress> {
        self.selected_address
    }

    pub fn select(&mut self, address: SlaveAddress) {
        self.selected_address = Some(address);
    }
}

#[test]
fn test1() {
    assert_eq!(SlaveAddress::try_from(0x07), Err(0x07));
    assert_eq!(SlaveAddress::try_from(0x08).map(u8::from), Ok(0x08));
    assert_eq!(SlaveAddress::try_from(0x77).map(u8::from), Ok(0x77));
    assert_eq!(SlaveAddress::try_from(0x78), Err(0x78));
    assert_eq!(SlaveAddress::try_from(0x00), Err(0x00));
    assert_eq!(SlaveAddress::try_from(0x0a).unwrap().to_string(), "0x0A");
}

#[test]
fn test2() {
    let mut session = Session::new();
    assert_eq!(session.selected_address(), None);
    let address = SlaveAddress::try_from(0x42).unwrap();
    session.select(address);
    assert_eq!(session.selected_address(), Some(address));
}
