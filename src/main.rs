//! xorriso-burner - command-line front end
//!
//! Queries print their answer as JSON; burn, blank and format print every
//! event as one JSON line on stdout. Logs go to stderr and the log file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use xorriso_burner::core::{BurnEvent, BurnOptions, BurnState, EventSink, Project, Settings};
use xorriso_burner::xorriso::Executor;
use xorriso_burner::{logging, BurnController, DriveQueries, QueryTimeouts};

const USAGE: &str = "\
Usage: xorriso-burner [--xorriso PATH] <command>

Commands:
  version                  Print the xorriso version banner
  drives                   List optical drives
  profiles DEV             List media profiles of a drive
  media DEV                Describe the loaded medium
  speeds DEV               List write speeds
  eject DEV                Eject the tray
  blank DEV MODE           Blank a rewritable disc (as_needed, all, fast)
  format DEV MODE          Format a disc (as_needed, full, ...)
  burn DEV PROJECT.json    Burn a project [--verify] [--dummy] [--speed S]
";

/// Prints each event as a JSON line on stdout
struct JsonLines;

impl EventSink for JsonLines {
    fn emit(&self, event: BurnEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Could not serialize {} event: {}", event.name(), e),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    match run(pico_args::Arguments::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(mut args: pico_args::Arguments) -> Result<(), String> {
    if args.contains(["-h", "--help"]) {
        print!("{}", USAGE);
        return Ok(());
    }

    let mut settings = Settings::load();
    if let Some(path) = args
        .opt_value_from_str::<_, PathBuf>("--xorriso")
        .map_err(|e| e.to_string())?
    {
        settings.xorriso_path = path;
    }

    let Some(command) = args.subcommand().map_err(|e| e.to_string())? else {
        print!("{}", USAGE);
        return Err("no command given".to_string());
    };

    let executor = Arc::new(Executor::new(&settings.xorriso_path));
    let queries = DriveQueries::new(executor.clone(), QueryTimeouts::from_settings(&settings));

    match command.as_str() {
        "version" => {
            let banner = queries.version().await.map_err(|e| e.to_string())?;
            println!("{}", banner);
        }
        "drives" => print_json(&queries.list_drives().await.map_err(|e| e.to_string())?)?,
        "profiles" => {
            let device = device_arg(&mut args)?;
            print_json(&queries.drive_profiles(&device).await.map_err(|e| e.to_string())?)?;
        }
        "media" => {
            let device = device_arg(&mut args)?;
            print_json(&queries.media_info(&device).await.map_err(|e| e.to_string())?)?;
        }
        "speeds" => {
            let device = device_arg(&mut args)?;
            print_json(&queries.write_speeds(&device).await.map_err(|e| e.to_string())?)?;
        }
        "eject" => {
            let device = device_arg(&mut args)?;
            queries.eject(&device).await.map_err(|e| e.to_string())?;
        }
        "blank" | "format" => {
            let device = device_arg(&mut args)?;
            let mode: String = args
                .free_from_str()
                .map_err(|_| format!("{} needs a MODE", command))?;
            let controller = controller(executor, &settings);
            let outcome = if command == "blank" {
                controller.blank_disc(&device, &mode).await
            } else {
                controller.format_disc(&device, &mode).await
            };
            outcome.map_err(|e| e.to_string())?;
        }
        "burn" => {
            let verify = args.contains("--verify");
            let dummy = args.contains("--dummy");
            let speed: Option<String> = args.opt_value_from_str("--speed").map_err(|e| e.to_string())?;
            let device = device_arg(&mut args)?;
            let project_path: PathBuf = args
                .free_from_str()
                .map_err(|_| "burn needs a PROJECT.json".to_string())?;

            let project = Project::load(&project_path)?;
            let mut opts = project.burn_options.clone();
            opts.verify |= verify;
            opts.dummy_mode |= dummy;
            if let Some(speed) = speed {
                opts.speed = speed;
            }

            burn(controller(executor, &settings), project, &device, opts).await?;
        }
        other => {
            print!("{}", USAGE);
            return Err(format!("unknown command: {}", other));
        }
    }

    let rest = args.finish();
    if !rest.is_empty() {
        log::warn!("Ignored arguments: {:?}", rest);
    }
    Ok(())
}

fn controller(executor: Arc<Executor>, settings: &Settings) -> BurnController {
    BurnController::new(
        executor,
        Arc::new(JsonLines),
        settings.media_timeout(),
        tokio::runtime::Handle::current(),
    )
}

/// Start the burn and wait for the job to settle
async fn burn(
    controller: BurnController,
    project: Project,
    device: &str,
    opts: BurnOptions,
) -> Result<(), String> {
    let job_id = controller
        .start_burn(project, device, opts)
        .map_err(|e| e.to_string())?;

    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let job = controller.get_job_status(&job_id).map_err(|e| e.to_string())?;
        match job.state {
            BurnState::Done => return Ok(()),
            BurnState::Error => return Err(job.error.unwrap_or_else(|| "burn failed".to_string())),
            BurnState::Cancelled => return Err("burn cancelled".to_string()),
            _ => {}
        }
    }
}

fn device_arg(args: &mut pico_args::Arguments) -> Result<String, String> {
    args.free_from_str().map_err(|_| "missing DEV argument".to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize: {}", e))?;
    println!("{}", json);
    Ok(())
}
