use anyhow::Result;
use lectern_tutor::*;

use log::{self, debug};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(
    rename_all = "kebab-case",
    about = "AI tutor service for the lectern e-learning platform"
)]
struct Opt {
    /// OpenAI API key; replies come from gpt-3.5-turbo when set
    #[structopt(
        global = true,
        long = "--openai-api-key",
        env = "OPENAI_API_KEY",
        hide_env_values = true
    )]
    openai_api_key: Option<String>,

    /// Hugging Face API key; used when no OpenAI key is configured
    #[structopt(
        global = true,
        long = "--huggingface-api-key",
        env = "HUGGINGFACE_API_KEY",
        hide_env_values = true
    )]
    huggingface_api_key: Option<String>,

    /// Log more messages. Pass multiple times for ever more verbosity
    #[structopt(global = true, long, short = "v", parse(from_occurrences))]
    verbose: i8,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Start tutor service as a foreground process
    Serve {
        #[structopt(long, env = "LECTERN_TUTOR_PORT", default_value = "3030")]
        port: u16,

        /// Seed the (in-memory) history with two sample conversations
        #[structopt(long)]
        demo_history: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        std::i8::MIN..=-1 => "none",
        0 => "warn",
        1 => "info",
        2 => "debug",
        3..=std::i8::MAX => "trace",
    };
    // hyper logging is very verbose, so crank that down even if everything else is more verbose
    let cli_filter = format!("{},hyper=error", log_level);
    // defer to env var config, fallback to CLI settings
    let log_filter = std::env::var("RUST_LOG").unwrap_or(cli_filter);
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&log_filter)
        .init();

    debug!("config parsed, starting up");

    match opt.cmd {
        Command::Serve { port, demo_history } => {
            let store: Box<dyn ConversationStore> = if demo_history {
                Box::new(MemoryStore::with_demo_history())
            } else {
                Box::new(MemoryStore::new())
            };
            let generator = TutorResponder::from_keys(
                opt.openai_api_key.as_deref(),
                opt.huggingface_api_key.as_deref(),
            )?;
            run_server(
                port,
                TutorState {
                    store,
                    generator: Box::new(generator),
                },
            )
        }
    }
}
