use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use argh::FromArgs;
use log::{LevelFilter, info};

use usbdesc::capture::CaptureFile;
use usbdesc::class::ClassContext;
use usbdesc::decoder::{emit_report, Event, EventSink, Inspector};
use usbdesc::render::TextRenderer;
use usbdesc::settings::Settings;

#[derive(FromArgs, PartialEq, Debug)]
/// List the descriptors of a USB device
struct Args {
    /// show string indices without fetching the strings
    #[argh(switch, short = 'n')]
    numeric: bool,
    /// look up vendor, product and class names
    #[argh(switch)]
    names: bool,
    /// skip HID report descriptors
    #[argh(switch)]
    no_reports: bool,
    /// spaces per collection level in report descriptors
    #[argh(option)]
    indent: Option<usize>,
    /// keep these options as the new defaults
    #[argh(switch)]
    save: bool,
    /// log decoding details
    #[argh(switch, short = 'v')]
    verbose: bool,
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Command {
    Dump(DumpCommand),
    Config(ConfigCommand),
    Report(ReportCommand),
}

#[derive(FromArgs, PartialEq, Debug)]
/// List every descriptor in a JSON capture of a device
#[argh(subcommand, name = "dump")]
struct DumpCommand {
    /// capture file
    #[argh(positional)]
    capture: PathBuf,
}

#[derive(FromArgs, PartialEq, Debug)]
/// List a raw configuration descriptor set
#[argh(subcommand, name = "config")]
struct ConfigCommand {
    /// file holding the bytes returned for GET_DESCRIPTOR(CONFIGURATION)
    #[argh(positional)]
    file: PathBuf,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Decode a raw HID report descriptor
#[argh(subcommand, name = "report")]
struct ReportCommand {
    /// file holding the report descriptor bytes
    #[argh(positional)]
    file: PathBuf,
}

impl Args {
    fn settings(&self) -> Settings {
        let mut settings = Settings::load();
        if self.numeric {
            settings.fetch_strings = false;
        }
        if self.names {
            settings.lookup_names = true;
        }
        if self.no_reports {
            settings.show_reports = false;
        }
        if let Some(indent) = self.indent {
            settings.indent = indent;
        }
        settings
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<(), Error> {
    let args: Args = argh::from_env();

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let settings = args.settings();
    if args.save {
        settings.save()?;
        info!("saved settings: {settings:?}");
    }

    let stdout = std::io::stdout().lock();
    let mut renderer = TextRenderer::new(stdout, settings.clone());

    match &args.command {
        Command::Dump(dump) => {
            let capture = CaptureFile::load(&dump.capture)?;
            Inspector::new(capture, settings).run(&mut renderer)?;
        },
        Command::Config(config) => {
            let bytes = read_file(&config.file)?;
            // Nothing to fetch strings or reports from.
            let settings = Settings {
                fetch_strings: false,
                show_reports: false,
                .. settings
            };
            let mut inspector = Inspector::new(CaptureFile::default(), settings);
            inspector.configuration(0, &bytes, ClassContext::default(), &mut renderer)?;
        },
        Command::Report(report) => {
            let bytes = read_file(&report.file)?;
            renderer.event(&Event::ReportStart {
                interface: 0,
                index: 0,
                length: u16::try_from(bytes.len()).unwrap_or(u16::MAX),
            })?;
            emit_report(&bytes, &mut renderer)?;
        },
    }

    renderer.into_inner().flush().context("Failed to write output")
}
