use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zerofile::cli::{check_file, show_info, write_sample, InfoOptions, SampleOptions};

/// Version info from build.rs
const VERSION: &str = env!("ZEROTOOL_VERSION");
const BUILD: &str = env!("ZEROTOOL_BUILD");
const PROFILE: &str = env!("ZEROTOOL_PROFILE");
const GIT_HASH: &str = env!("ZEROTOOL_GIT_HASH");

/// Combined version string (compile-time concatenation not possible, so we build at runtime)
fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        format!(
            "{} {} build {} ({}), format {}",
            PROFILE,
            VERSION,
            BUILD,
            GIT_HASH,
            zerofile::params::ZEROFILE_VERSION
        )
    })
}

#[derive(Parser)]
#[command(name = "zerotool")]
#[command(author, about = "Inspect and validate Zerofile parasitic extraction captures", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Log traversal details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunk tree of a Zerofile
    #[command(alias = "i")]
    Info {
        /// Zerofile to inspect
        file: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Rows of 16 payload bytes to preview per chunk
        #[arg(long, default_value_t = 2)]
        rows: usize,

        /// Print a BLAKE3 digest of every payload
        #[arg(long)]
        checksum: bool,
    },

    /// Validate every payload against the extraction parameters
    #[command(alias = "c")]
    Check {
        /// Zerofile to validate
        file: PathBuf,
    },

    /// Write a synthetic Zerofile with random volume samples
    #[command(alias = "s")]
    Sample {
        /// Output file
        output: PathBuf,

        /// Frame width in pixels
        #[arg(long, default_value_t = 640)]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value_t = 1536)]
        height: u32,

        /// Number of PVOL frames
        #[arg(long, default_value_t = 1)]
        frames: usize,

        /// Horizontal pitch in micrometers
        #[arg(long, default_value_t = 9.7409)]
        pitch: f32,

        /// Command buffer text stored in a CBUF chunk
        #[arg(long)]
        command: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. from a test harness) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("zerotool {}", get_version());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            println!();
            return ExitCode::SUCCESS;
        }
    };

    let result = match command {
        Commands::Info {
            file,
            json,
            rows,
            checksum,
        } => {
            let options = InfoOptions {
                json,
                rows,
                checksum,
            };
            show_info(&file, &options).map(|info| {
                print!("{}", info);
                true
            })
        }

        Commands::Check { file } => check_file(&file).map(|report| {
            print!("{}", report);
            report.is_clean()
        }),

        Commands::Sample {
            output,
            width,
            height,
            frames,
            pitch,
            command,
        } => {
            let options = SampleOptions {
                width,
                height,
                frames,
                h_pitch_um: pitch,
                command_buffer: command.map(String::into_bytes).unwrap_or_default(),
                ..Default::default()
            };
            write_sample(&output, &options).map(|written| {
                println!("Wrote {} bytes to {}", written, output.display());
                true
            })
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
