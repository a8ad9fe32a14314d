//! run one simulation from a json request
//!
//! reads the request from `--input` or stdin and prints the response view

use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use mortgage_engine_rs::{
    CalculationContext, Decimal, MortgageEngine, ResidualPolicy, SafeTimeProvider,
    SimulationRequest, SimulationResponse, TimeSource,
};

#[derive(Parser)]
#[command(name = "simulate", version, about = "Mortgage schedule and cost indicators")]
struct Cli {
    /// request file; stdin when omitted
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// annual cost of opportunity capital in percent, overrides the request
    #[arg(long)]
    cok: Option<Decimal>,

    /// fail when the irr does not converge
    #[arg(long)]
    strict: bool,

    /// close the final balance at exactly zero
    #[arg(long)]
    absorb_residual: bool,

    /// pretty-print the response
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<String, Box<dyn std::error::Error>> {
    let raw = match &cli.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut request = SimulationRequest::from_json(&raw)?;
    if let Some(cok) = cli.cok {
        request.cok_percent = Some(cok.into());
    }
    let params = request.into_parameters()?;

    let mut ctx = if cli.strict {
        CalculationContext::strict()
    } else {
        CalculationContext::standard()
    };
    if cli.absorb_residual {
        ctx = ctx.with_residual_policy(ResidualPolicy::AbsorbIntoFinalPayment);
    }

    let time = SafeTimeProvider::new(TimeSource::System);
    let result = MortgageEngine::new(ctx.clone()).calculate(&params, &time)?;
    log::info!(
        "{} periods, tcea {}",
        result.schedule.len(),
        ctx.percent_str(result.indicators.tcea)
    );

    let response = SimulationResponse::from_result(&result, &ctx);
    Ok(if cli.pretty {
        response.to_json_pretty()?
    } else {
        response.to_json()?
    })
}
