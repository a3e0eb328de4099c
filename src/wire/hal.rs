// embedded-hal I2Cドライバーを2線式バスとして使う
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::hexbytes::format_hex_bytes;
use crate::wire::{BUFFER_LENGTH, Transmission, TransmissionStatus, WireBus};
use embedded_hal::i2c::{Error, ErrorKind, I2c, NoAcknowledgeSource};
use std::collections::VecDeque;

/// embedded-hal I2Cドライバーの上に載せた2線式バス
pub struct HalWire<I> {
    i2c: I,
    transmission: Option<Transmission>,
    received: VecDeque<u8>,
}

impl<I: I2c> HalWire<I> {
    pub fn new(i2c: I) -> Self {
        HalWire {
            i2c,
            transmission: None,
            received: VecDeque::with_capacity(BUFFER_LENGTH),
        }
    }

    /// ドライバーを返す
    pub fn release(self) -> I {
        self.i2c
    }
}

/// エラー種別から状態コードへ
pub fn status_from_error_kind(kind: ErrorKind) -> TransmissionStatus {
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => TransmissionStatus::AddressNack,
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => TransmissionStatus::DataNack,
        _ => TransmissionStatus::Other,
    }
}

impl<I: I2c> WireBus for HalWire<I> {
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
        if tx.overflow {
            return TransmissionStatus::DataTooLong;
        }
        tracing::trace!(target:"Tx->", "0x{:02X} [{}]", tx.address, format_hex_bytes(&tx.data));
        match self.i2c.write(tx.address, &tx.data) {
            Ok(()) => TransmissionStatus::Success,
            Err(e) => {
                tracing::debug!("i2c write to 0x{:02X} failed: {:?}", tx.address, e.kind());
                status_from_error_kind(e.kind())
            }
        }
    }

    fn request_from(&mut self, address: u8, count: usize) -> usize {
        self.received.clear();
        let count = count.min(BUFFER_LENGTH);
        if count == 0 {
            return 0;
        }
        let mut buffer = vec![0u8; count];
        match self.i2c.read(address, &mut buffer) {
            Ok(()) => {
                tracing::trace!(target:"<-Rx", "0x{:02X} [{}]", address, format_hex_bytes(&buffer));
                self.received.extend(buffer);
                count
            }
            Err(e) => {
                tracing::debug!("i2c read from 0x{:02X} failed: {:?}", address, e.kind());
                0
            }
        }
    }

    fn available(&self) -> usize {
        self.received.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.received.pop_front()
    }
}

#[cfg(test)]
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

#[test]
fn test1() {
    let expectations = [I2cTransaction::write(0x10, vec![0x01, 0x02, 0x03])];
    let mut wire = HalWire::new(I2cMock::new(&expectations));

    wire.begin_transmission(0x10);
    assert_eq!(wire.write(0x01), 1);
    assert_eq!(wire.write(0x02), 1);
    assert_eq!(wire.write(0x03), 1);
    assert_eq!(wire.end_transmission(), TransmissionStatus::Success);

    wire.release().done();
}

#[test]
fn test2() {
    let expectations = [
        I2cTransaction::write(0x10, vec![0x01])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        I2cTransaction::write(0x11, vec![0x01])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)),
        I2cTransaction::write(0x12, vec![0x01]).with_error(ErrorKind::ArbitrationLoss),
    ];
    let mut wire = HalWire::new(I2cMock::new(&expectations));

    for (address, expected) in [
        (0x10, TransmissionStatus::AddressNack),
        (0x11, TransmissionStatus::DataNack),
        (0x12, TransmissionStatus::Other),
    ] {
        wire.begin_transmission(address);
        wire.write(0x01);
        assert_eq!(wire.end_transmission(), expected);
    }

    wire.release().done();
}

#[test]
fn test3() {
    // 溢れた送信はバスに出さない
    let mut wire = HalWire::new(I2cMock::new(&[]));
    wire.begin_transmission(0x10);
    for n in 0..BUFFER_LENGTH {
        assert_eq!(wire.write(n as u8), 1);
    }
    assert_eq!(wire.write(0xff), 0);
    assert_eq!(wire.end_transmission(), TransmissionStatus::DataTooLong);
    // 開始していない送信
    assert_eq!(wire.write(0x00), 0);
    assert_eq!(wire.end_transmission(), TransmissionStatus::Other);

    wire.release().done();
}

#[test]
fn test4() {
    let expectations = [
        I2cTransaction::read(0x42, vec![0x0a, 0xff, 0x00, 0x1b]),
        I2cTransaction::read(0x43, vec![0x00, 0x00])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
    ];
    let mut wire = HalWire::new(I2cMock::new(&expectations));

    assert_eq!(wire.request_from(0x42, 4), 4);
    assert_eq!(wire.available(), 4);
    let received: Vec<u8> = std::iter::from_fn(|| wire.read()).collect();
    assert_eq!(received, vec![0x0a, 0xff, 0x00, 0x1b]);
    assert_eq!(wire.available(), 0);

    assert_eq!(wire.request_from(0x43, 2), 0);
    assert_eq!(wire.read(), None);

    wire.release().done();
}
