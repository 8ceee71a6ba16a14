use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use smart_garden_core_sdk::{
    config,
    groq::GroqService,
    models::{AlertContext, AlertKind, WeatherData},
    secrets::SecretResolver,
    telemetry,
};

/**
 * \brief CLI entry point: a thin shell over the garden assistant SDK.
 */
#[derive(Parser, Debug)]
#[command(name = "smart-garden", version, about = "Smart Garden plant-care assistant")]
struct Cli {
    /// Append diagnostics to logs/smart-garden.log
    #[arg(long, global = true, default_value_t = false)]
    telemetry: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief Show which credentials resolved (values redacted).
     */
    Credentials,

    /**
     * \brief Ask the botanist a plant-care question.
     * \param prompt        the question
     * \param plant_context optional plant description
     */
    Ask {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "")]
        plant_context: String,
    },

    /**
     * \brief Phrase a weather alert for a plant.
     */
    Alert {
        /// rain, storm or heat; anything else prints the generic reminder
        #[arg(long)]
        kind: String,
        #[arg(long)]
        plant: String,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    config::load_dotenv();
    telemetry::set_enabled(cli.telemetry || telemetry::enabled_from_env());
    let credentials =
        config::initialize(config::load_all_credentials(&SecretResolver::from_default_sources()));

    match cli.command {
        Commands::Credentials => {
            for (name, shown, present) in credentials.redacted() {
                let status = if present { "set" } else { "unset" };
                println!("{:<22} {:<6} {}", name, status, shown);
            }
        }
        Commands::Ask {
            prompt,
            plant_context,
        } => {
            if prompt.trim().is_empty() {
                bail!("--prompt must not be empty");
            }
            let service = GroqService::new(credentials);
            telemetry::log_event(
                "cli.ask",
                &format!(
                    "state={:?} prompt_len={} context_len={}",
                    service.state(),
                    prompt.len(),
                    plant_context.len()
                ),
            );
            println!("{}", service.answer_question(&prompt, &plant_context).await);
        }
        Commands::Alert {
            kind,
            plant,
            city,
            description,
            temperature,
        } => {
            let ctx = AlertContext {
                kind: AlertKind::parse(&kind),
                plant_name: plant,
                weather: WeatherData {
                    city: city.or_else(|| default_city(credentials.default_location())),
                    description,
                    temperature,
                },
            };
            let service = GroqService::new(credentials);
            telemetry::log_event(
                "cli.alert",
                &format!("state={:?} kind={} plant={}", service.state(), ctx.kind, ctx.plant_name),
            );
            println!(
                "{}",
                service
                    .generate_alert(&ctx.kind, &ctx.plant_name, &ctx.weather)
                    .await
            );
        }
    }

    Ok(())
}

/** \brief "Lahore,PK" -> "Lahore". */
fn default_city(location: &str) -> Option<String> {
    location
        .split(',')
        .next()
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(str::to_string)
}
