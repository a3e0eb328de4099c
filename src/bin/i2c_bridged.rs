// シリアル通信で受けたコマンドをI2Cバスに中継する。
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use anyhow::Context;
use clap::Parser;
use i2cbridge::BridgeSettings;
use i2cbridge::bridge::{self, CommandEngine, Console};
use i2cbridge::wire::WireBus;
use serialport::{DataBits, SerialPort, StopBits};
use std::io::{self, BufReader};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// シリアル-I2Cブリッジ
#[derive(Parser, Debug)]
#[command(name = "i2c_bridged")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 設定ファイル名
    #[arg(short = 'S', long, default_value = "i2cbridge.toml")]
    settings_file: String,

    /// シリアルデバイス名
    #[arg(short = 'D', long, env = "SERIAL_DEVICE", default_value = "/dev/ttyUSB0")]
    device: String,

    /// シリアルデバイスの代わりに標準入出力を使う
    #[arg(long, action)]
    stdio: bool,

    /// I2Cバスデバイス名
    #[arg(long, env = "I2C_BUS", default_value = "/dev/i2c-1")]
    i2c_bus: String,

    /// 設定ファイルの模擬デバイスをつないだ模擬バスを使う
    #[arg(long, action)]
    simulate: bool,

    /// 診断出力を止める(エラーは出す)
    #[arg(short, long, action)]
    quiet: bool,
}

/// 設定ファイルを読む。なければ既定値
fn load_settings(file_name: &str) -> anyhow::Result<BridgeSettings> {
    if Path::new(file_name).exists() {
        BridgeSettings::from_file(file_name)
            .with_context(|| format!(r#"setting file "{}" read error."#, file_name))
    } else {
        tracing::warn!(r#"setting file "{}" not found, using defaults."#, file_name);
        Ok(BridgeSettings::default())
    }
}

/// シリアルポートを開く
fn open_port(port_name: &str, settings: &BridgeSettings) -> anyhow::Result<Box<dyn SerialPort>> {
    let builder = serialport::new(port_name, settings.baud_rate)
        .stop_bits(StopBits::One)
        .data_bits(DataBits::Eight)
        .timeout(Duration::from_millis(settings.read_timeout_ms));

    builder
        .open()
        .with_context(move || format!("Failed to open \"{}\".", port_name))
}

/// I2Cバスを開く
#[cfg(target_os = "linux")]
fn open_i2c_bus(path: &str) -> anyhow::Result<Box<dyn WireBus>> {
    let i2c = linux_embedded_hal::I2cdev::new(path)
        .with_context(|| format!("Failed to open \"{}\".", path))?;
    Ok(Box::new(i2cbridge::wire::HalWire::new(i2c)))
}

#[cfg(not(target_os = "linux"))]
fn open_i2c_bus(path: &str) -> anyhow::Result<Box<dyn WireBus>> {
    anyhow::bail!(r#""{}" i2c-dev is only available on Linux. use --simulate"#, path)
}

fn open_bus(cli: &Cli, settings: &BridgeSettings) -> anyhow::Result<Box<dyn WireBus>> {
    if cli.simulate {
        let wire = settings.simulated_wire();
        let addresses = wire
            .addresses()
            .map(|n| format!("0x{:02X}", n))
            .collect::<Vec<String>>();
        tracing::info!("simulated bus with devices [{}]", addresses.join(","));
        Ok(Box::new(wire))
    } else {
        tracing::info!(r#"i2c bus "{}""#, cli.i2c_bus);
        open_i2c_bus(&cli.i2c_bus)
    }
}

/// コマンドを受け付ける
fn exec_bridge(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli.settings_file)?;

    let bus = open_bus(cli, &settings)?;
    let mut engine = CommandEngine::new(bus).with_max_write_bytes(settings.max_write_bytes);
    let debug = settings.debug && !cli.quiet;

    if cli.stdio {
        let mut reader = io::stdin().lock();
        let mut console = Console::new(io::stdout()).with_debug(debug);
        bridge::serve(&mut reader, &mut engine, &mut console).context("stdio failed!")
    } else {
        // シリアルポートを開く
        let serial_port = open_port(&cli.device, &settings)?;

        // シリアルポート読み込みはバッファリングする
        let mut reader = serial_port
            .try_clone()
            .map(BufReader::new)
            .context("Failed to clone")?;
        let mut console = Console::new(serial_port).with_debug(debug);

        tracing::info!(
            r#"listening on "{}" {} baud"#,
            cli.device,
            settings.baud_rate
        );
        bridge::serve(&mut reader, &mut engine, &mut console).context("serial port failed!")
    }
}

fn main() -> ExitCode {
    let _ = dotenv::dotenv();

    // プログラムの情報
    let git_head_ref = built_info::GIT_HEAD_REF.unwrap_or_default();
    let app_info = format!(
        "{} / {}{}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::GIT_COMMIT_HASH_SHORT
            .map(|s| format!(" ({s} - {git_head_ref})"))
            .unwrap_or_default()
    );

    // tracingの設定
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    // systemd-journaldに接続
    match tracing_journald::layer() {
        // journaldにログ出力する
        Ok(journald_layer) => registry.with(journald_layer).init(),
        // journaldが使えないので、標準エラー出力にログ出力する
        Err(e) => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
                        .with_file(false)
                        .with_line_number(false)
                        .with_thread_names(false)
                        .with_thread_ids(false)
                        .with_ansi(false)
                        .with_writer(io::stderr),
                )
                .init();
            tracing::warn!("couldn't connect to journald: {}", e)
        }
    }

    // コマンドライン引数
    let cli = Cli::parse();

    tracing::info!("{app_info} started.");
    match exec_bridge(&cli) {
        Ok(()) => {
            tracing::info!("{app_info} finished.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{app_info} aborted, reason: {e:#}");
            ExitCode::FAILURE
        }
    }
}
