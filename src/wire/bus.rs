// バスコントローラーの操作と送信バッファ
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::wire::TransmissionStatus;

/// 送信バッファの大きさ
pub const BUFFER_LENGTH: usize = 32;

/// 2線式バスコントローラー
///
/// 送信は `begin_transmission` で始めて `write` でバイトを積み、
/// `end_transmission` で実際にバスへ送出して状態コードを得る。
/// 受信は `request_from` で要求して、受信できた分を `read` で1バイトずつ取り出す。
pub trait WireBus {
    /// 送信を開始する
    fn begin_transmission(&mut self, address: u8);

    /// 送信バッファに1バイト積む。積めたバイト数(0か1)を返す
    fn write(&mut self, byte: u8) -> usize;

    /// 送信を終了する
    fn end_transmission(&mut self) -> TransmissionStatus;

    /// `count`バイトを要求する。受信できたバイト数を返す
    fn request_from(&mut self, address: u8, count: usize) -> usize;

    /// 受信バッファに残っているバイト数
    fn available(&self) -> usize;

    /// 受信バッファから1バイト取り出す
    fn read(&mut self) -> Option<u8>;
}

impl<B: WireBus + ?Sized> WireBus for Box<B> {
    fn begin_transmission(&mut self, address: u8) {
        (**self).begin_transmission(address)
    }

    fn write(&mut self, byte: u8) -> usize {
        (**self).write(byte)
    }

    fn end_transmission(&mut self) -> TransmissionStatus {
        (**self).end_transmission()
    }

    fn request_from(&mut self, address: u8, count: usize) -> usize {
        (**self).request_from(address, count)
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }
}

/// 送信中のデーター
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Transmission {
    pub address: u8,
    pub data: Vec<u8>,
    pub overflow: bool,
}

impl Transmission {
    pub fn new(address: u8) -> Self {
        Transmission {
            address,
            data: Vec::with_capacity(BUFFER_LENGTH),
            overflow: false,
        }
    }

    /// 満杯なら積まずに溢れた印をつける
    pub fn push(&mut self, byte: u8) -> usize {
        if self.data.len() < BUFFER_LENGTH {
            self.data.push(byte);
            1
        } else {
            self.overflow = true;
            0
        }
    }
}

#[test]
fn test1() {
    let mut tx = Transmission::new(0x10);
    for n in 0..BUFFER_LENGTH {
        assert_eq!(tx.push(n as u8), 1);
    }
    assert!(!tx.overflow);
    assert_eq!(tx.push(0xff), 0);
    assert!(tx.overflow);
    assert_eq!(tx.data.len(), BUFFER_LENGTH);
}
