mod config;
mod telemetry;
mod workload;

use clap::Parser;
use config::{CliArgs, RunConfig};
use telemetry::init_telemetry;
use workload::Generator;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;

    let generator = Generator::configure(&config)?;

    if config.ddl {
        for statement in workload::ddl(generator.as_dyn()) {
            println!("{statement};");
        }
        return Ok(());
    }

    tracing::info!(
        threads = config.threads,
        ids_per_thread = config.ids_per_thread,
        tenants = config.tenants,
        "running {}",
        generator.describe()
    );

    let report = workload::run(&generator, &config)?;

    println!("generator:      {}", generator.describe());
    println!("identifiers:    {} ({} unique)", report.generated, report.unique);
    println!("accesses:       {}", report.accesses);
    println!("ids per access: {:.2}", report.ids_per_access());
    println!("elapsed:        {:?}", report.elapsed);

    Ok(())
}
