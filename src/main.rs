use clap::Parser;
use matrix_pixelator::cli::{self, Args, Command};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Config { action } => {
            cli::handle_config_action(action, args.config.as_deref());
        }
        Command::Encode {
            input,
            name,
            settings_json,
            settings,
            output,
        } => {
            let result = cli::load_config(args.config.as_deref())
                .map_err(Into::into)
                .and_then(|cfg| {
                    cli::run_encode(
                        &cfg,
                        &input,
                        name.as_deref(),
                        settings_json.as_deref(),
                        &settings,
                        &output,
                    )
                });
            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Preview {
            input,
            output,
            settings,
        } => {
            let result = cli::load_config(args.config.as_deref())
                .map_err(Into::into)
                .and_then(|cfg| cli::run_preview(&cfg, &input, &output, &settings));
            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
