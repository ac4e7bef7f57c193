use tailor_engine::cli::CliOverrides;
use tailor_engine::runner;

fn main() {
    let cli_overrides = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config = match runner::load_config(cli_overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("[config] {err:?}");
            std::process::exit(2);
        }
    };
    runner::init_tracing(&config.log_level);
    match runner::run(config) {
        Ok(summary) => tracing::info!(
            tag = "runner",
            ticks = summary.ticks,
            ran_main = summary.ran_main,
            draw_commands = summary.last_frame_commands,
            "run finished"
        ),
        Err(err) => {
            eprintln!("Application error: {err:?}");
            std::process::exit(1);
        }
    }
}
