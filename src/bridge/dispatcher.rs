// 1行ずつ受信してコマンドを振り分ける
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::bridge::{Command, CommandEngine, CommandError, Console, Outcome, USAGE};
use crate::hexbytes::format_hex_bytes;
use crate::wire::WireBus;
use std::io::{self, BufRead};

/// 実行結果を出力する
pub fn report<W: io::Write>(
    console: &mut Console<W>,
    result: &Result<Outcome, CommandError>,
) -> io::Result<()> {
    match result {
        Ok(Outcome::AddressSelected(address)) => {
            console.debug(&format!("Address set to {address}"))
        }
        Ok(Outcome::Received { address, data }) => {
            console.print(&format_hex_bytes(data))?;
            console.debug(&format!("Read {} bytes from {address}", data.len()))
        }
        Ok(Outcome::Transmitted { address, count }) => {
            console.debug(&format!("Wrote {count} bytes to {address}"))
        }
        Ok(Outcome::Usage) => console.print(USAGE),
        Err(e) => console.debug_forced(&format!("Error: {e}")),
    }
}

/// 1行を処理する
pub fn dispatch<B: WireBus, W: io::Write>(
    line: &str,
    engine: &mut CommandEngine<B>,
    console: &mut Console<W>,
) -> io::Result<()> {
    let command = Command::from_line(line);
    tracing::debug!("{:?}", command);
    let result = engine.execute(command);
    if let Err(e) = &result {
        tracing::warn!("{e}");
    }
    report(console, &result)
}

/// 改行まで受信する
///
/// 読み込みタイムアウトは無視して受信を続ける。
/// 入力の終わりならNoneを返す。
pub fn receive_line<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::<u8>::new();
    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) if buf.is_empty() => return Ok(None),
            Ok(_) if buf.ends_with(b"\n") => break,
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue, // タイムアウトエラーは無視する
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let line = String::from_utf8_lossy(&buf).into_owned();
    tracing::trace!(target:"<-Rx", "{}", line.escape_debug());
    Ok(Some(line))
}

/// 入力が終わるまでコマンドを処理し続ける
pub fn serve<R, B, W>(
    reader: &mut R,
    engine: &mut CommandEngine<B>,
    console: &mut Console<W>,
) -> io::Result<()>
where
    R: BufRead + ?Sized,
    B: WireBus,
    W: io::Write,
{
    while let Some(line) = receive_line(reader)? {
        dispatch(&line, engine, console)?;
    }
    Ok(())
}

#[cfg(test)]
use crate::wire::{SimulatedDevice, SimulatedWire, Transaction, TransmissionStatus};

#[cfg(test)]
fn run(input: &str, wire: SimulatedWire) -> (String, CommandEngine<SimulatedWire>) {
    let mut engine = CommandEngine::new(wire);
    let mut console = Console::new(Vec::new());
    serve(&mut input.as_bytes(), &mut engine, &mut console).unwrap();
    let output = String::from_utf8(console.into_inner()).unwrap();
    (output, engine)
}

#[test]
fn test1() {
    let mut wire = SimulatedWire::new();
    wire.attach(0x42, SimulatedDevice::with_memory(&[0x0a, 0xff, 0x00, 0x1b]));
    let (output, engine) = run("a 42\nr 04\n", wire);
    assert_eq!(
        output,
        [
            "[DBG] Address set to 0x42\r\n",
            "0A FF 00 1B\r\n",
            "[DBG] Read 4 bytes from 0x42\r\n",
        ]
        .concat()
    );
    assert_eq!(engine.bus().journal().len(), 1);
}

#[test]
fn test2() {
    let mut wire = SimulatedWire::new();
    wire.attach(0x10, SimulatedDevice::new());
    let (output, engine) = run("  a 10 \r\nw 01 02 03\r\nw 01 gg 03\r\n", wire);
    assert_eq!(
        output,
        [
            "[DBG] Address set to 0x10\r\n",
            "[DBG] Wrote 3 bytes to 0x10\r\n",
            "[DBG] Error: invalid hex token \"gg\"\r\n",
        ]
        .concat()
    );
    assert_eq!(
        engine.bus().journal(),
        &[Transaction::Write {
            address: 0x10,
            data: vec![1, 2, 3],
            status: TransmissionStatus::Success,
        }]
    );
}

#[test]
fn test3() {
    let (output, engine) = run("\nx\nr 04\na 7\n", SimulatedWire::new());
    let usage = USAGE
        .lines()
        .map(|s| format!("{s}\r\n"))
        .collect::<String>();
    assert_eq!(
        output,
        [
            usage.as_str(),
            usage.as_str(),
            "[DBG] Error: no address set; use the address command first\r\n",
            "[DBG] Error: invalid I2C address 0x07; valid range is 0x08-0x77\r\n",
        ]
        .concat()
    );
    assert_eq!(engine.session().selected_address(), None);
    assert!(engine.bus().journal().is_empty());
}

#[test]
fn test4() {
    let (output, _engine) = run("a 10\nw 01\n", SimulatedWire::new());
    assert_eq!(
        output,
        [
            "[DBG] Address set to 0x10\r\n",
            "[DBG] Error: write to 0x10 failed with status 2 (received NACK on transmit of address)\r\n",
        ]
        .concat()
    );
}

#[test]
fn test5() {
    // デバッグ表示を切ると主出力とエラーだけになる
    let mut wire = SimulatedWire::new();
    wire.attach(0x42, SimulatedDevice::with_memory(&[0x01, 0x02]));
    let mut engine = CommandEngine::new(wire);
    let mut console = Console::new(Vec::new()).with_debug(false);
    let input = "a 42\nr 02\nr 21\n";
    serve(&mut input.as_bytes(), &mut engine, &mut console).unwrap();
    assert_eq!(
        String::from_utf8(console.into_inner()).unwrap(),
        "01 02\r\n[DBG] Error: invalid byte count \"21\"; valid range is 01-20\r\n"
    );
}

#[test]
fn test6() {
    // 最後の行に改行がなくても処理する
    let mut reader: &[u8] = b"a 42\r\nr 04";
    assert_eq!(receive_line(&mut reader).unwrap(), Some("a 42\r\n".to_owned()));
    assert_eq!(receive_line(&mut reader).unwrap(), Some("r 04".to_owned()));
    assert_eq!(receive_line(&mut reader).unwrap(), None);
}

/// 決まった区切りで届いて途中でエラーも返す受信側
#[cfg(test)]
pub(crate) struct Chunks(std::collections::VecDeque<Result<Vec<u8>, io::ErrorKind>>);

#[cfg(test)]
impl Chunks {
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<&'static str, io::ErrorKind>>,
    {
        Chunks(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(|s| s.as_bytes().to_vec()))
                .collect(),
        )
    }
}

#[cfg(test)]
impl io::Read for Chunks {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.pop_front() {
            None => Ok(0),
            Some(Err(kind)) => Err(kind.into()),
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.0.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

#[test]
fn test7() {
    // タイムアウトをまたいだ行もつなげて処理する
    use io::ErrorKind::TimedOut;
    let mut reader = io::BufReader::new(Chunks::new([
        Ok("a 4"),
        Err(TimedOut),
        Ok("2\nr"),
        Err(TimedOut),
        Err(TimedOut),
        Ok(" 01\n"),
    ]));
    let mut wire = SimulatedWire::new();
    wire.attach(0x42, SimulatedDevice::with_memory(&[0xab]));
    let mut engine = CommandEngine::new(wire);
    let mut console = Console::new(Vec::new());
    serve(&mut reader, &mut engine, &mut console).unwrap();
    assert_eq!(
        String::from_utf8(console.into_inner()).unwrap(),
        "[DBG] Address set to 0x42\r\nAB\r\n[DBG] Read 1 bytes from 0x42\r\n"
    );
}

#[test]
fn test8() {
    // タイムアウト以外の受信エラーで終わる
    let mut reader = io::BufReader::new(Chunks::new([
        Ok("a 42\n"),
        Err(io::ErrorKind::BrokenPipe),
        Ok("r 01\n"),
    ]));
    let mut engine = CommandEngine::new(SimulatedWire::new());
    let mut console = Console::new(Vec::new());
    let error = serve(&mut reader, &mut engine, &mut console).unwrap_err();
    assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(
        String::from_utf8(console.into_inner()).unwrap(),
        "[DBG] Address set to 0x42\r\n"
    );
    assert!(engine.bus().journal().is_empty());
}
