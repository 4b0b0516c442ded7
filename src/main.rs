//! 命令行入口

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use page_translator::env::{core::LogLevel, generate_env_docs, EnvVar};
use page_translator::translation::config::load_translation_config;
use page_translator::translation::{
    build_backend, BackendKind, ConfigManager, FilePreferenceStore, MemoryPreferenceStore,
    PreferenceStore, ScanMode, TranslationConfig,
};
use page_translator::{translate_page_from_data, PageOptions, PageTranslatorError};

const STDIN_INPUT: &str = "-";

#[derive(Parser, Debug)]
#[command(
    name = "page-translator",
    version,
    about = "Inject a language selector into a documentation page and translate its text"
)]
struct Cli {
    /// HTML file to process, `-` reads standard input
    #[arg(value_name = "INPUT", default_value = STDIN_INPUT)]
    input: String,

    /// Language to switch the page to
    #[arg(short, long, value_name = "CODE")]
    lang: Option<String>,

    /// Write the result to a file instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Charset of the input when the document declares none
    #[arg(short = 'E', long, value_name = "CHARSET")]
    encoding: Option<String>,

    /// Translation backend
    #[arg(long, value_parser = ["mymemory", "deeplx"])]
    backend: Option<String>,

    /// Backend endpoint
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// How translatable text is discovered
    #[arg(long, value_parser = ["text-nodes", "elements"])]
    scan: Option<String>,

    /// File holding the saved language preference
    #[arg(long, value_name = "FILE")]
    preference_file: Option<PathBuf>,

    /// Neither read nor write the saved language preference
    #[arg(long)]
    no_preference: bool,

    /// Do not inject the language selector
    #[arg(long)]
    no_selector: bool,

    /// Print the configured languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Print the supported environment variables and exit
    #[arg(long)]
    env_docs: bool,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "FILE")]
    init_config: Option<PathBuf>,
}

impl Cli {
    /// 命令行参数覆盖配置
    fn apply_overrides(&self, config: &mut TranslationConfig) {
        if let Some(backend) = &self.backend {
            config.backend = match backend.as_str() {
                "deeplx" => BackendKind::DeepLx,
                _ => BackendKind::MyMemory,
            };
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = Some(api_url.clone());
        }
        if let Some(scan) = &self.scan {
            config.scan = match scan.as_str() {
                "elements" => ScanMode::Elements,
                _ => ScanMode::TextNodes,
            };
        }
        if let Some(path) = &self.preference_file {
            config.preference_path = path.to_string_lossy().into_owned();
        }
    }

    fn load_config(&self) -> Result<TranslationConfig, PageTranslatorError> {
        let mut config = match &self.config {
            Some(path) => ConfigManager::from_path(path)?.into_config(),
            None => load_translation_config(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn read_input(&self) -> Result<Vec<u8>, PageTranslatorError> {
        if self.input == STDIN_INPUT {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            Ok(data)
        } else {
            fs::read(&self.input).map_err(|e| {
                PageTranslatorError::new(&format!("无法读取 {}: {}", self.input, e))
            })
        }
    }

    fn write_output(&self, data: &[u8]) -> Result<(), PageTranslatorError> {
        match &self.output {
            Some(path) => fs::write(path, data)?,
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(LogLevel::get_or_default("info".to_string()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), PageTranslatorError> {
    if let Some(path) = &cli.init_config {
        ConfigManager::generate_example_config(path)?;
        eprintln!("已写入示例配置: {}", path.display());
        return Ok(());
    }

    if cli.env_docs {
        print!("{}", generate_env_docs());
        return Ok(());
    }

    let config = cli.load_config()?;

    if cli.list_languages {
        for language in &config.languages {
            let marker = if config.is_default_lang(&language.code) { " *" } else { "" };
            println!("{}\t{} {}{}", language.code, language.flag, language.name, marker);
        }
        return Ok(());
    }

    let input = cli.read_input()?;
    let backend = build_backend(&config)?;
    let preferences: Box<dyn PreferenceStore> = if cli.no_preference {
        Box::new(MemoryPreferenceStore::new())
    } else {
        Box::new(FilePreferenceStore::from_config(&config))
    };

    let options = PageOptions {
        encoding: cli.encoding.clone(),
        inject_selector: !cli.no_selector,
        target_lang: cli.lang.clone(),
        restore_saved: !cli.no_preference,
    };

    let output = translate_page_from_data(&input, &options, &config, backend, preferences).await?;
    cli.write_output(&output)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
