//! 命令行入口

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dom_translator::env::{core::LogLevel, EnvVar};
use dom_translator::env::generate_env_docs;
use dom_translator::translation::error::helpers::{internal_error, validation_error};
use dom_translator::translation::{
    translate_html, ConfigManager, TranslationConfig, TranslationResult,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate the visible text of an HTML document
    Translate {
        /// Input HTML file, or "-" for stdin
        input: String,

        /// Target locale
        #[arg(short, long)]
        locale: String,

        /// Output file, defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base URL of the translation API
        #[arg(short, long)]
        api_base: Option<String>,

        /// Path to the on-disk translation cache
        #[arg(long)]
        cache_db: Option<String>,

        /// Input charset, detected from the document when omitted
        #[arg(short, long)]
        encoding: Option<String>,

        /// Path to config file
        #[arg(short = 'f', long)]
        config: Option<PathBuf>,
    },
    /// Print the supported environment variables
    EnvDocs,
    /// Write an example config file
    InitConfig {
        #[arg(default_value = "dom-translator.toml")]
        path: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::get_or_default("info".to_string())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> TranslationResult<TranslationConfig> {
    match path {
        Some(path) => Ok(ConfigManager::from_file(path)?.into_config()),
        None => Ok(ConfigManager::new()?.into_config()),
    }
}

fn read_input(input: &str) -> io::Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(input)
    }
}

fn run(cli: Cli) -> TranslationResult<()> {
    match cli.command {
        Command::EnvDocs => {
            print!("{}", generate_env_docs());
            Ok(())
        }
        Command::InitConfig { path } => {
            ConfigManager::generate_example_config(&path)?;
            eprintln!("已写入示例配置: {}", path.display());
            Ok(())
        }
        Command::Translate {
            input,
            locale,
            output,
            api_base,
            cache_db,
            encoding,
            config,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(api_base) = api_base {
                config.api_base = api_base;
            }
            if cache_db.is_some() {
                config.storage_path = cache_db;
            }
            config.validate()?;
            if !config.is_supported_locale(&locale) {
                return Err(validation_error(format!("不支持的语言: {}", locale)));
            }

            let data = read_input(&input)
                .map_err(|e| validation_error(format!("无法读取输入 {}: {}", input, e)))?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| internal_error(format!("无法创建运行时: {}", e)))?;
            let local = tokio::task::LocalSet::new();
            let (html, report) = local.block_on(
                &runtime,
                translate_html(&data, encoding.as_deref(), &locale, config),
            )?;

            if let Some(error) = &report.error {
                tracing::warn!("翻译未完全成功: {}", error);
            }

            match output {
                Some(path) => fs::write(&path, html).map_err(|e| {
                    validation_error(format!("无法写入输出 {}: {}", path.display(), e))
                })?,
                None => io::stdout().write_all(&html)?,
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
