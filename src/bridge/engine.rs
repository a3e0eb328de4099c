// コマンドを実行してバスを操作する
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::bridge::{Command, Session, SlaveAddress};
use crate::hexbytes::{self, HexTokenError};
use crate::wire::{BUFFER_LENGTH, TransmissionStatus, WireBus};
use thiserror::Error;

/// 1回で読み出せる最大バイト数
pub const MAX_READ_BYTES: u8 = 0x20;

/// 1回で書き込める最大バイト数
pub const MAX_WRITE_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no address provided")]
    NoAddressProvided,

    #[error("invalid I2C address 0x{0:02X}; valid range is 0x08-0x77")]
    InvalidAddress(u8),

    #[error(transparent)]
    HexToken(#[from] HexTokenError),

    #[error("no byte count provided")]
    NoByteCount,

    #[error(r#"invalid byte count "{0}"; valid range is 01-20"#)]
    InvalidByteCount(String),

    #[error("no address set; use the address command first")]
    AddressNotSet,

    #[error("no response from device at {0}")]
    NoResponse(SlaveAddress),

    #[error("no bytes provided")]
    NoBytesProvided,

    #[error("no valid bytes found")]
    NoValidBytes,

    #[error("write to {address} failed with status {status}")]
    Transmission {
        address: SlaveAddress,
        status: TransmissionStatus,
    },
}

/// コマンドの実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AddressSelected(SlaveAddress),
    Received {
        address: SlaveAddress,
        data: Vec<u8>,
    },
    Transmitted {
        address: SlaveAddress,
        count: usize,
    },
    Usage,
}

/// コマンドエンジン
pub struct CommandEngine<B> {
    bus: B,
    session: Session,
    max_write_bytes: usize,
}

impl<B: WireBus> CommandEngine<B> {
    pub fn new(bus: B) -> Self {
        CommandEngine {
            bus,
            session: Session::new(),
            max_write_bytes: MAX_WRITE_BYTES,
        }
    }

    /// 書き込みバイト数の上限を変える(1～送信バッファ長)
    pub fn with_max_write_bytes(mut self, max_write_bytes: usize) -> Self {
        self.max_write_bytes = max_write_bytes.clamp(1, BUFFER_LENGTH);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome, CommandError> {
        match command {
            Command::SetAddress(args) => self.set_address(args),
            Command::Read(args) => self.read(args),
            Command::Write(args) => self.write(args),
            Command::Usage => Ok(Outcome::Usage),
        }
    }

    /// a xx
    pub fn set_address(&mut self, args: &str) -> Result<Outcome, CommandError> {
        let args = args.trim();
        if args.is_empty() {
            return Err(CommandError::NoAddressProvided);
        }
        let bytes = hexbytes::parse_hex_bytes(args, 1)?;
        let &[value] = bytes.as_slice() else {
            return Err(CommandError::NoAddressProvided);
        };
        let address = SlaveAddress::try_from(value).map_err(CommandError::InvalidAddress)?;
        self.session.select(address);
        tracing::debug!("address set to {address}");
        Ok(Outcome::AddressSelected(address))
    }

    /// r xx
    pub fn read(&mut self, args: &str) -> Result<Outcome, CommandError> {
        let args = args.trim();
        if args.is_empty() {
            return Err(CommandError::NoByteCount);
        }
        let count = match hexbytes::parse_hex_bytes(args, 1).as_deref() {
            Ok(&[n @ 1..=MAX_READ_BYTES]) => n,
            _ => return Err(CommandError::InvalidByteCount(args.to_owned())),
        };
        let address = self
            .session
            .selected_address()
            .ok_or(CommandError::AddressNotSet)?;

        let available = self.bus.request_from(address.get(), count as usize);
        if available == 0 {
            return Err(CommandError::NoResponse(address));
        }
        let bus = &mut self.bus;
        let data = std::iter::from_fn(|| bus.read())
            .take(available)
            .collect::<Vec<u8>>();
        tracing::debug!("{} bytes read from {address}", data.len());
        Ok(Outcome::Received { address, data })
    }

    /// w xx xx ...
    pub fn write(&mut self, args: &str) -> Result<Outcome, CommandError> {
        if args.is_empty() {
            return Err(CommandError::NoBytesProvided);
        }
        let address = self
            .session
            .selected_address()
            .ok_or(CommandError::AddressNotSet)?;
        let bytes = hexbytes::parse_hex_bytes(args, self.max_write_bytes)?;
        if bytes.is_empty() {
            return Err(CommandError::NoValidBytes);
        }

        self.bus.begin_transmission(address.get());
        for byte in bytes.iter() {
            self.bus.write(*byte);
        }
        match self.bus.end_transmission() {
            TransmissionStatus::Success => {
                tracing::debug!("{} bytes written to {address}", bytes.len());
                Ok(Outcome::Transmitted {
                    address,
                    count: bytes.len(),
                })
            }
            status => Err(CommandError::Transmission { address, status }),
        }
    }
}

#[cfg(test)]
use crate::wire::{SimulatedDevice, SimulatedWire, Transaction};

#[cfg(test)]
fn engine_with(devices: &[(u8, SimulatedDevice)]) -> CommandEngine<SimulatedWire> {
    let mut wire = SimulatedWire::new();
    for (address, device) in devices {
        wire.attach(*address, device.clone());
    }
    CommandEngine::new(wire)
}

#[cfg(test)]
fn address(n: u8) -> SlaveAddress {
    SlaveAddress::try_from(n).unwrap()
}

#[test]
fn test1() {
    let mut engine = engine_with(&[]);
    for n in SlaveAddress::MIN..=SlaveAddress::MAX {
        let s = format!("{:02x}", n);
        assert_eq!(
            engine.set_address(&s),
            Ok(Outcome::AddressSelected(address(n)))
        );
        assert_eq!(address(n).to_string(), format!("0x{}", s.to_uppercase()));
        assert_eq!(engine.session().selected_address(), Some(address(n)));
    }
    assert!(engine.bus().journal().is_empty());
}

#[test]
fn test2() {
    let mut engine = engine_with(&[]);
    engine.set_address(" 42").unwrap();

    assert_eq!(engine.set_address(""), Err(CommandError::NoAddressProvided));
    assert_eq!(engine.set_address("   "), Err(CommandError::NoAddressProvided));
    assert_eq!(engine.set_address("00"), Err(CommandError::InvalidAddress(0x00)));
    assert_eq!(engine.set_address("07"), Err(CommandError::InvalidAddress(0x07)));
    assert_eq!(engine.set_address("78"), Err(CommandError::InvalidAddress(0x78)));
    assert_eq!(engine.set_address("FF"), Err(CommandError::InvalidAddress(0xff)));
    assert_eq!(
        engine.set_address("zz"),
        Err(CommandError::HexToken(HexTokenError::InvalidToken(
            "zz".to_owned()
        )))
    );
    // 失敗しても変わらない
    assert_eq!(engine.session().selected_address(), Some(address(0x42)));
    assert!(engine.bus().journal().is_empty());
}

#[test]
fn test3() {
    let mut engine = engine_with(&[]);
    for n in 1..=MAX_READ_BYTES {
        assert_eq!(
            engine.read(&format!("{:02X}", n)),
            Err(CommandError::AddressNotSet)
        );
    }
    assert!(engine.bus().journal().is_empty());
}

#[test]
fn test4() {
    let device = SimulatedDevice::with_memory(&[0x0a, 0xff, 0x00, 0x1b]);
    let mut engine = engine_with(&[(0x42, device)]);
    engine.set_address("42").unwrap();

    assert_eq!(
        engine.read(" 04"),
        Ok(Outcome::Received {
            address: address(0x42),
            data: vec![0x0a, 0xff, 0x00, 0x1b],
        })
    );
    assert_eq!(
        engine.bus().journal(),
        &[Transaction::Read {
            address: 0x42,
            requested: 4,
            received: vec![0x0a, 0xff, 0x00, 0x1b],
        }]
    );
}

#[test]
fn test5() {
    let mut engine = engine_with(&[(0x42, SimulatedDevice::new())]);
    engine.set_address("42").unwrap();

    let invalid = |s: &str| Err(CommandError::InvalidByteCount(s.to_owned()));
    assert_eq!(engine.read(""), Err(CommandError::NoByteCount));
    assert_eq!(engine.read("21"), invalid("21"));
    assert_eq!(engine.read("00"), invalid("00"));
    assert_eq!(engine.read("xy"), invalid("xy"));
    assert!(engine.bus().journal().is_empty());

    // 最大値
    match engine.read("20") {
        Ok(Outcome::Received { data, .. }) => assert_eq!(data.len(), 32),
        other => panic!("{other:?}"),
    }
}

#[test]
fn test6() {
    let mut engine = engine_with(&[]);
    engine.set_address("33").unwrap();
    assert_eq!(
        engine.read("04"),
        Err(CommandError::NoResponse(address(0x33)))
    );
    assert_eq!(
        CommandError::NoResponse(address(0x33)).to_string(),
        "no response from device at 0x33"
    );
}

#[test]
fn test7() {
    let mut engine = engine_with(&[(0x10, SimulatedDevice::new())]);
    assert_eq!(engine.write(" 01 02 03"), Err(CommandError::AddressNotSet));
    engine.set_address("10").unwrap();

    assert_eq!(
        engine.write(" 01 02 03"),
        Ok(Outcome::Transmitted {
            address: address(0x10),
            count: 3,
        })
    );
    assert_eq!(
        engine.bus().journal(),
        &[Transaction::Write {
            address: 0x10,
            data: vec![0x01, 0x02, 0x03],
            status: TransmissionStatus::Success,
        }]
    );
    assert_eq!(&engine.bus().device(0x10).unwrap().memory()[1..3], &[0x02, 0x03]);
}

#[test]
fn test8() {
    let mut engine = engine_with(&[(0x10, SimulatedDevice::new())]);
    engine.set_address("10").unwrap();

    assert_eq!(engine.write(""), Err(CommandError::NoBytesProvided));
    assert_eq!(engine.write("   "), Err(CommandError::NoValidBytes));
    assert_eq!(
        engine.write(" 01 gg 03"),
        Err(CommandError::HexToken(HexTokenError::InvalidToken(
            "gg".to_owned()
        )))
    );
    assert!(engine.bus().journal().is_empty());
}

#[test]
fn test9() {
    let mut engine = engine_with(&[(0x11, SimulatedDevice::new().read_only())]);
    engine.set_address("10").unwrap();

    let error = engine.write("01 02 03").unwrap_err();
    assert_eq!(
        error,
        CommandError::Transmission {
            address: address(0x10),
            status: TransmissionStatus::AddressNack,
        }
    );
    let message = error.to_string();
    assert!(message.contains("2"));
    assert!(message.contains("received NACK on transmit of address"));

    engine.set_address("11").unwrap();
    assert_eq!(
        engine.write("01 02"),
        Err(CommandError::Transmission {
            address: address(0x11),
            status: TransmissionStatus::DataNack,
        })
    );
}

#[test]
fn test10() {
    let mut engine = engine_with(&[(0x10, SimulatedDevice::new())]).with_max_write_bytes(4);
    engine.set_address("10").unwrap();

    // 上限を超えた分は送らない
    assert_eq!(
        engine.write("00 01 02 03 04 05"),
        Ok(Outcome::Transmitted {
            address: address(0x10),
            count: 4,
        })
    );
    assert_eq!(
        engine.execute(Command::from_line("help")),
        Ok(Outcome::Usage)
    );
}
