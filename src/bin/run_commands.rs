// コマンドファイルを読んで1行ずつブリッジに送る。
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use anyhow::Context;
use clap::Parser;
use i2cbridge::bridge::script::{self, Response};
use serialport::{DataBits, SerialPort, StopBits};
use std::fs;
use std::io::{BufReader, Write};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// ブリッジにコマンドファイルを流す
#[derive(Parser, Debug)]
#[command(name = "run_commands")]
#[command(version, about, long_about = None)]
struct Cli {
    /// コマンドファイル名
    command_file: String,

    /// シリアルデバイス名
    #[arg(short = 'p', long, default_value = "/dev/ttyACM0")]
    port: String,

    /// ボーレート
    #[arg(short = 'b', long, default_value_t = 9600)]
    baudrate: u32,

    /// ブリッジの診断出力も表示する
    #[arg(short = 'v', long, action)]
    verbose: bool,
}

/// ブリッジのリセット待ち時間
const RESET_WAIT: Duration = Duration::from_millis(250);

/// コマンド送信後の応答待ち時間
const RESPONSE_WAIT: Duration = Duration::from_millis(100);

/// シリアルポートを開く
fn open_port(port_name: &str, baud_rate: u32) -> anyhow::Result<Box<dyn SerialPort>> {
    let builder = serialport::new(port_name, baud_rate)
        .stop_bits(StopBits::One)
        .data_bits(DataBits::Eight)
        .timeout(Duration::from_secs(2));

    builder
        .open()
        .with_context(move || format!("Failed to open \"{}\".", port_name))
}

/// 届いている応答をすべて読む
fn drain_responses(
    port: &dyn SerialPort,
    reader: &mut BufReader<Box<dyn SerialPort>>,
) -> anyhow::Result<()> {
    while port.bytes_to_read()? > 0 || !reader.buffer().is_empty() {
        let Some(line) =
            script::receive_response(reader).context("serial port read failed!")?
        else {
            break;
        };
        match script::classify_response(&line) {
            Response::Debug(s) => tracing::debug!("{s}"),
            Response::Output(s) => println!("<--- {s}"),
            Response::Void => {}
        }
    }
    Ok(())
}

fn exec_commands(cli: &Cli) -> anyhow::Result<()> {
    let commands = fs::read_to_string(&cli.command_file)
        .with_context(|| format!("Command file '{}' not found", cli.command_file))?;

    // シリアルポートを開く
    let mut port = open_port(&cli.port, cli.baudrate)?;
    let mut reader = port
        .try_clone()
        .map(BufReader::new)
        .context("Failed to clone")?;

    // ブリッジのリセットを待つ
    thread::sleep(RESET_WAIT);
    tracing::info!("Connected to I2C bridge on {}", cli.port);
    tracing::info!("Starting execution of commands from: {}", cli.command_file);

    let mut line_number = 0;
    let mut executed_count = 0;
    for line in commands.lines() {
        line_number += 1;
        let Some(parsed) = script::parse_script_line(line) else {
            continue;
        };
        match parsed.comment {
            Some(comment) => tracing::debug!("Line {line_number}: '{}' # {comment}", parsed.command),
            None => tracing::debug!("Line {line_number}: '{}'", parsed.command),
        }
        if parsed.command.is_empty() {
            continue;
        }

        // コマンド送信
        println!("---> {}", parsed.command);
        let command = format!("{}\n", parsed.command);
        tracing::trace!(target:"Tx->", "{}", command.escape_debug());
        port.write_all(command.as_bytes())
            .context("serial port write failed!")?;
        executed_count += 1;

        // 応答を受信する
        thread::sleep(RESPONSE_WAIT);
        drain_responses(&*port, &mut reader)?;
    }

    tracing::debug!("Execution completed: {executed_count} commands from {line_number} lines");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // デバッグレベルは RUST_LOG 環境変数でも設定できる
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    exec_commands(&cli)
}
