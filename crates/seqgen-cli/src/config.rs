use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use seqgen::{Capabilities, IdentifierType, Params, config};

/// Which generator facade to configure.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// A database sequence (or a single-row table where sequences are
    /// unsupported).
    Sequence,
    /// One segment row of a shared generator table.
    Table,
}

/// Command line of the `seqgen` binary.
///
/// Every option can also be supplied through the environment variable named
/// in its help text, or through a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "seqgen",
    version,
    about = "Generate identifiers from many threads against an in-memory database"
)]
pub struct CliArgs {
    /// Generator facade to use.
    ///
    /// Environment variable: `SEQGEN_GENERATOR`
    #[arg(long, value_enum, env = "SEQGEN_GENERATOR", default_value_t = GeneratorKind::Sequence)]
    pub generator: GeneratorKind,

    /// Optimizer strategy: none, hilo, legacy-hilo, pooled or pooled-lo.
    ///
    /// Defaults to `none` for an increment size of 1 and `pooled` otherwise.
    ///
    /// Environment variable: `SEQGEN_OPTIMIZER`
    #[arg(long, env = "SEQGEN_OPTIMIZER")]
    pub optimizer: Option<String>,

    /// Identifiers handed out per physical access.
    ///
    /// Environment variable: `SEQGEN_INCREMENT_SIZE`
    #[arg(long, env = "SEQGEN_INCREMENT_SIZE", default_value_t = 50)]
    pub increment_size: i64,

    /// First value of a newly created sequence or row.
    ///
    /// Environment variable: `SEQGEN_INITIAL_VALUE`
    #[arg(long, env = "SEQGEN_INITIAL_VALUE")]
    pub initial_value: Option<i64>,

    /// Sequence name (sequence generator) or table name (table generator).
    ///
    /// Environment variable: `SEQGEN_NAME`
    #[arg(long, env = "SEQGEN_NAME")]
    pub name: Option<String>,

    /// Segment row used by the table generator.
    ///
    /// Environment variable: `SEQGEN_SEGMENT_VALUE`
    #[arg(long, env = "SEQGEN_SEGMENT_VALUE")]
    pub segment_value: Option<String>,

    /// Identifier type values are coerced to: short, integer or long.
    ///
    /// Environment variable: `SEQGEN_IDENTIFIER_TYPE`
    #[arg(long, env = "SEQGEN_IDENTIFIER_TYPE", default_value_t = String::from("long"))]
    pub identifier_type: String,

    /// Threads sharing the generator.
    ///
    /// Environment variable: `SEQGEN_THREADS`
    #[arg(long, env = "SEQGEN_THREADS", default_value_t = 4)]
    pub threads: usize,

    /// Identifiers each thread generates.
    ///
    /// Environment variable: `SEQGEN_IDS_PER_THREAD`
    #[arg(long, env = "SEQGEN_IDS_PER_THREAD", default_value_t = 10_000)]
    pub ids_per_thread: usize,

    /// Number of tenants, each with its own database. Threads are spread
    /// across tenants round-robin. 0 runs without tenant identifiers.
    ///
    /// Environment variable: `SEQGEN_TENANTS`
    #[arg(long, env = "SEQGEN_TENANTS", default_value_t = 0)]
    pub tenants: usize,

    /// Pretend the database has no sequence support.
    #[arg(long, env = "SEQGEN_NO_SEQUENCES", default_value_t = false)]
    pub no_sequences: bool,

    /// Use a table even when sequences are available.
    #[arg(long, env = "SEQGEN_FORCE_TABLE_USE", default_value_t = false)]
    pub force_table_use: bool,

    /// Extra generator parameter as `key=value`. May be repeated.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Print the DDL of the configured generator and exit.
    #[arg(long, default_value_t = false)]
    pub ddl: bool,
}

/// Validated settings of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub generator: GeneratorKind,
    pub params: Params,
    pub identifier_type: IdentifierType,
    pub capabilities: Capabilities,
    pub threads: usize,
    pub ids_per_thread: usize,
    pub tenants: usize,
    pub ddl: bool,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.threads == 0 {
            bail!("SEQGEN_THREADS must be greater than 0");
        }
        if args.ids_per_thread == 0 {
            bail!("SEQGEN_IDS_PER_THREAD must be greater than 0");
        }

        let identifier_type = args
            .identifier_type
            .parse::<IdentifierType>()
            .context("invalid SEQGEN_IDENTIFIER_TYPE")?;

        let mut params = Params::new()
            .with(config::INCREMENT_PARAM, args.increment_size)
            .with(config::FORCE_TABLE_PARAM, args.force_table_use);
        if let Some(optimizer) = args.optimizer {
            params.insert(config::OPT_PARAM, optimizer);
        }
        if let Some(initial_value) = args.initial_value {
            params.insert(config::INITIAL_PARAM, initial_value);
        }
        if let Some(name) = args.name {
            let key = match args.generator {
                GeneratorKind::Sequence => config::SEQUENCE_PARAM,
                GeneratorKind::Table => config::TABLE_PARAM,
            };
            params.insert(key, name);
        }
        if let Some(segment_value) = args.segment_value {
            params.insert(config::SEGMENT_VALUE_PARAM, segment_value);
        }
        for raw in &args.params {
            let Some((key, value)) = raw.split_once('=') else {
                bail!("parameter `{raw}` is not of the form KEY=VALUE");
            };
            if key.trim().is_empty() {
                bail!("parameter `{raw}` has an empty key");
            }
            params.insert(key.trim(), value);
        }

        Ok(Self {
            generator: args.generator,
            params,
            identifier_type,
            capabilities: Capabilities {
                supports_sequences: !args.no_sequences,
            },
            threads: args.threads,
            ids_per_thread: args.ids_per_thread,
            tenants: args.tenants,
            ddl: args.ddl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<RunConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("seqgen").chain(args.iter().copied()))?;
        RunConfig::try_from(args)
    }

    #[test]
    fn defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.generator, GeneratorKind::Sequence);
        assert_eq!(config.identifier_type, IdentifierType::Long);
        assert_eq!(config.params.get("increment_size"), Some("50"));
        assert_eq!(config.params.get("optimizer"), None);
        assert!(config.capabilities.supports_sequences);
        assert_eq!(config.threads, 4);
        assert!(!config.ddl);
    }

    #[test]
    fn name_targets_the_generator_kind() {
        let config = parse(&["--generator", "table", "--name", "hi_values"]).unwrap();
        assert_eq!(config.params.get("table_name"), Some("hi_values"));
        assert_eq!(config.params.get("sequence_name"), None);

        let config = parse(&["--name", "order_seq"]).unwrap();
        assert_eq!(config.params.get("sequence_name"), Some("order_seq"));
    }

    #[test]
    fn extra_params() {
        let config = parse(&["-p", "schema=app", "--param", "optimistic_retry_limit=8"]).unwrap();
        assert_eq!(config.params.get("schema"), Some("app"));
        assert_eq!(config.params.get("optimistic_retry_limit"), Some("8"));

        assert!(parse(&["-p", "schema"]).is_err());
        assert!(parse(&["-p", "=app"]).is_err());
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(parse(&["--threads", "0"]).is_err());
        assert!(parse(&["--ids-per-thread", "0"]).is_err());
        assert!(parse(&["--identifier-type", "uuid"]).is_err());
        assert!(parse(&["--generator", "snowflake"]).is_err());
    }
}
