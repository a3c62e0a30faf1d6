use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::crew::agent::DEFAULT_MAX_ITERATIONS;

pub const DEFAULT_SCRATCH_DIR: &str = "temp_uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub scratch_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_iterations: usize,
    pub quiet: bool,
    pub llm: LlmConfig,
}

pub fn command() -> Command {
    Command::new("financial-analyzer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("HTTP service that runs an LLM financial analyst over uploaded PDFs")
        .long_about(
            "Serves POST /analyze: upload a PDF as the `file` form field together with an\n\
            optional `query`, and a financial-analyst agent reads the document through\n\
            read_data_tool and answers the query.",
        )
        .arg(
            Arg::new("host")
                .long("host")
                .env("HOST")
                .value_name("ADDR")
                .default_value("0.0.0.0")
                .help("Address to bind"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .env("PORT")
                .value_name("PORT")
                .default_value("8000")
                .value_parser(value_parser!(u16))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("scratch-dir")
                .long("scratch-dir")
                .env("SCRATCH_DIR")
                .value_name("DIR")
                .default_value(DEFAULT_SCRATCH_DIR)
                .value_parser(value_parser!(PathBuf))
                .help("Directory where uploads are staged while they are analyzed"),
        )
        .arg(
            Arg::new("max-upload-bytes")
                .long("max-upload-bytes")
                .env("MAX_UPLOAD_BYTES")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .help("Largest accepted request body (default: 32 MiB)"),
        )
        .arg(
            Arg::new("llm-api-key")
                .long("llm-api-key")
                .value_name("KEY")
                .help("API key for the chat-completions endpoint (or OPENAI_API_KEY)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("llm-endpoint")
                .long("llm-endpoint")
                .env("LLM_ENDPOINT")
                .value_name("URL")
                .help("OpenAI-compatible chat-completions URL"),
        )
        .arg(
            Arg::new("llm-model")
                .long("llm-model")
                .env("LLM_MODEL")
                .value_name("MODEL")
                .help("Model name sent with every completion request"),
        )
        .arg(
            Arg::new("llm-max-tokens")
                .long("llm-max-tokens")
                .env("LLM_MAX_TOKENS")
                .value_name("N")
                .default_value("4096")
                .value_parser(value_parser!(u32))
                .help("Completion token limit"),
        )
        .arg(
            Arg::new("llm-timeout")
                .long("llm-timeout")
                .env("LLM_TIMEOUT_SECS")
                .value_name("SECS")
                .default_value("120")
                .value_parser(value_parser!(u64))
                .help("Timeout for a single completion request"),
        )
        .arg(
            Arg::new("max-iterations")
                .long("max-iterations")
                .env("AGENT_MAX_ITERATIONS")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Tool-calling rounds an agent may take per task (default: 15)"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors")
                .action(ArgAction::SetTrue),
        )
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let host = matches
            .get_one::<String>("host")
            .cloned()
            .context("host is required")?;

        // API key from command line or environment
        let api_key = matches
            .get_one::<String>("llm-api-key")
            .cloned()
            .or_else(|| env::var("OPENAI_API_KEY").ok());

        Ok(Self {
            host,
            port: matches.get_one::<u16>("port").copied().unwrap_or(8000),
            scratch_dir: matches
                .get_one::<PathBuf>("scratch-dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_DIR)),
            max_upload_bytes: matches
                .get_one::<usize>("max-upload-bytes")
                .copied()
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_iterations: matches
                .get_one::<usize>("max-iterations")
                .copied()
                .unwrap_or(DEFAULT_MAX_ITERATIONS),
            quiet: matches.get_flag("quiet"),
            llm: LlmConfig {
                api_key,
                endpoint: matches.get_one::<String>("llm-endpoint").cloned(),
                model: matches.get_one::<String>("llm-model").cloned(),
                max_tokens: matches.get_one::<u32>("llm-max-tokens").copied().unwrap_or(4096),
                timeout: Duration::from_secs(
                    matches.get_one::<u64>("llm-timeout").copied().unwrap_or(120),
                ),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
