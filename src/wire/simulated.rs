// 模擬2線式バス
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::hexbytes::format_hex_bytes;
use crate::wire::{BUFFER_LENGTH, Transmission, TransmissionStatus, WireBus};
use std::collections::{BTreeMap, VecDeque};

/// 模擬デバイスのレジスタ数
pub const REGISTER_COUNT: usize = 256;

/// 模擬デバイス
///
/// 256バイトのレジスタファイルを持つ。
/// 書き込みの先頭バイトでレジスタポインタを選び、続くバイトをそこから格納する。
/// 読み出しはレジスタポインタから返す。ポインタはどちらも自動で進む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedDevice {
    memory: Vec<u8>,
    pointer: u8,
    read_only: bool,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        SimulatedDevice {
            memory: vec![0; REGISTER_COUNT],
            pointer: 0,
            read_only: false,
        }
    }

    /// 先頭からの初期値を与える。あふれた分は捨てる
    pub fn with_memory(initial: &[u8]) -> Self {
        let mut device = Self::new();
        let n = initial.len().min(REGISTER_COUNT);
        device.memory[..n].copy_from_slice(&initial[..n]);
        device
    }

    /// 書き込み禁止にする(データーにNACKを返す)
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    fn receive(&mut self, data: &[u8]) -> TransmissionStatus {
        match data {
            // アドレスだけの送信
            [] => TransmissionStatus::Success,
            [pointer, rest @ ..] => {
                self.pointer = *pointer;
                if self.read_only && !rest.is_empty() {
                    return TransmissionStatus::DataNack;
                }
                for byte in rest {
                    self.memory[self.pointer as usize] = *byte;
                    self.pointer = self.pointer.wrapping_add(1);
                }
                TransmissionStatus::Success
            }
        }
    }

    fn transmit(&mut self, count: usize) -> Vec<u8> {
        (0..count)
            .map(|_| {
                let byte = self.memory[self.pointer as usize];
                self.pointer = self.pointer.wrapping_add(1);
                byte
            })
            .collect()
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// 模擬バス上で起きたこと
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Write {
        address: u8,
        data: Vec<u8>,
        status: TransmissionStatus,
    },
    Read {
        address: u8,
        requested: usize,
        received: Vec<u8>,
    },
}

/// 模擬2線式バス
#[derive(Debug, Clone, Default)]
pub struct SimulatedWire {
    devices: BTreeMap<u8, SimulatedDevice>,
    transmission: Option<Transmission>,
    received: VecDeque<u8>,
    journal: Vec<Transaction>,
}

impl SimulatedWire {
    pub fn new() -> Self {
        Self::default()
    }

    /// デバイスをつなぐ
    pub fn attach(&mut self, address: u8, device: SimulatedDevice) -> &mut Self {
        self.devices.insert(address, device);
        self
    }

    pub fn device(&self, address: u8) -> Option<&SimulatedDevice> {
        self.devices.get(&address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = u8> + '_ {
        self.devices.keys().copied()
    }

    /// これまでのトランザクション
    pub fn journal(&self) -> &[Transaction] {
        &self.journal
    }
}

impl WireBus for SimulatedWire {
    fn begin_transmission(&mut self, address: u8) {
        self.transmission = Some(Transmission::new(address));
    }

    fn write(&mut self, byte: u8) -> usize {
        match self.transmission.as_mut() {
            Some(tx) => tx.push(byte),
            None => 0,
        }
    }

    fn end_transmission(&mut self) -> TransmissionStatus {
        let Some(tx) = self.transmission.take() else {
            return TransmissionStatus::Other;
        };
        let status = if tx.overflow {
            TransmissionStatus::DataTooLong
        } else {
            match self.devices.get_mut(&tx.address) {
                Some(device) => device.receive(&tx.data),
                None => TransmissionStatus::AddressNack,
            }
        };
        tracing::trace!(target:"Tx->", "0x{:02X} [{}] {}", tx.address, format_hex_bytes(&tx.data), status);
        self.journal.push(Transaction::Write {
            address: tx.address,
            data: tx.data,
            status,
        });
        status
    }

    fn request_from(&mut self, address: u8, count: usize) -> usize {
        self.received.clear();
        let count = count.min(BUFFER_LENGTH);
        let received = match self.devices.get_mut(&address) {
            Some(device) => device.transmit(count),
            None => Vec::new(),
        };
        tracing::trace!(target:"<-Rx", "0x{:02X} [{}]", address, format_hex_bytes(&received));
        self.received.extend(received.iter().copied());
        self.journal.push(Transaction::Read {
            address,
            requested: count,
            received,
        });
        self.received.len()
    }

    fn available(&self) -> usize {
        self.received.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.received.pop_front()
    }
}

#[test]
fn test1() {
    let mut wire = SimulatedWire::new();
    wire.attach(0x50, SimulatedDevice::new());

    wire.begin_transmission(0x50);
    for byte in [0x10, 0xaa, 0xbb] {
        wire.write(byte);
    }
    assert_eq!(wire.end_transmission(), TransmissionStatus::Success);
    assert_eq!(&wire.device(0x50).unwrap().memory()[0x10..0x12], &[0xaa, 0xbb]);
    assert_eq!(wire.device(0x50).unwrap().pointer(), 0x12);

    // ポインタを戻して読む
    wire.begin_transmission(0x50);
    wire.write(0x10);
    assert_eq!(wire.end_transmission(), TransmissionStatus::Success);
    assert_eq!(wire.request_from(0x50, 3), 3);
    assert_eq!(wire.read(), Some(0xaa));
    assert_eq!(wire.read(), Some(0xbb));
    assert_eq!(wire.read(), Some(0x00));
    assert_eq!(wire.read(), None);
}

#[test]
fn test2() {
    let mut wire = SimulatedWire::new();
    wire.attach(0x20, SimulatedDevice::with_memory(&[1, 2]).read_only());

    // つながっていないアドレス
    wire.begin_transmission(0x21);
    wire.write(0x00);
    assert_eq!(wire.end_transmission(), TransmissionStatus::AddressNack);
    assert_eq!(wire.request_from(0x21, 4), 0);
    assert_eq!(wire.available(), 0);

    // 書き込み禁止
    wire.begin_transmission(0x20);
    wire.write(0x00);
    wire.write(0xff);
    assert_eq!(wire.end_transmission(), TransmissionStatus::DataNack);
    assert_eq!(&wire.device(0x20).unwrap().memory()[..2], &[1, 2]);

    assert_eq!(
        wire.journal(),
        &[
            Transaction::Write {
                address: 0x21,
                data: vec![0x00],
                status: TransmissionStatus::AddressNack,
            },
            Transaction::Read {
                address: 0x21,
                requested: 4,
                received: vec![],
            },
            Transaction::Write {
                address: 0x20,
                data: vec![0x00, 0xff],
                status: TransmissionStatus::DataNack,
            },
        ]
    );
}

#[test]
fn test3() {
    let mut wire = SimulatedWire::new();
    wire.attach(0x30, SimulatedDevice::new());
    wire.begin_transmission(0x30);
    for n in 0..=BUFFER_LENGTH {
        wire.write(n as u8);
    }
    assert_eq!(wire.end_transmission(), TransmissionStatus::DataTooLong);
    assert_eq!(wire.device(0x30).unwrap().memory(), &[0u8; REGISTER_COUNT][..]);
}
