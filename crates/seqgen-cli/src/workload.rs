use std::{
    collections::HashSet,
    sync::{Arc, Barrier},
    thread::scope,
    time::{Duration, Instant},
};

use anyhow::{Context, bail};
use seqgen::{
    IdentifierGenerator, MemoryDatabase, SchemaObject, SequenceStyleGenerator, Session,
    TableGenerator,
};

use crate::config::{GeneratorKind, RunConfig};

/// The configured generator facade.
pub enum Generator {
    Sequence(SequenceStyleGenerator),
    Table(TableGenerator),
}

impl Generator {
    pub fn configure(config: &RunConfig) -> anyhow::Result<Self> {
        Ok(match config.generator {
            GeneratorKind::Sequence => Self::Sequence(SequenceStyleGenerator::configure(
                config.identifier_type,
                &config.params,
                &config.capabilities,
            )?),
            GeneratorKind::Table => Self::Table(TableGenerator::configure(
                config.identifier_type,
                &config.params,
                &config.capabilities,
            )?),
        })
    }

    pub fn as_dyn(&self) -> &dyn IdentifierGenerator {
        match self {
            Self::Sequence(g) => g,
            Self::Table(g) => g,
        }
    }

    pub fn accesses(&self) -> u64 {
        match self {
            Self::Sequence(g) => g.times_accessed(),
            Self::Table(g) => g.table_access_count(),
        }
    }

    pub fn describe(&self) -> String {
        let (kind, optimizer) = match self {
            Self::Sequence(g) => ("sequence", g.optimizer()),
            Self::Table(g) => ("table", g.optimizer()),
        };
        format!(
            "{kind} generator `{}` with optimizer {} (increment size {})",
            self.as_dyn().generator_key(),
            optimizer.descriptor(),
            optimizer.increment_size()
        )
    }
}

/// The schema statements needed by `generator`.
pub fn ddl(generator: &dyn IdentifierGenerator) -> Vec<String> {
    generator
        .schema_objects()
        .iter()
        .flat_map(SchemaObject::create_sql)
        .collect()
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub generated: usize,
    pub unique: usize,
    pub accesses: u64,
    pub elapsed: Duration,
}

impl Report {
    pub fn ids_per_access(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.generated as f64 / self.accesses as f64
        }
    }
}

/// Drives `generator` from `config.threads` threads and checks that no tenant
/// ever saw the same identifier twice.
///
/// # Errors
///
/// Fails if the schema cannot be created, any `generate` call fails, or a
/// duplicate identifier is detected.
pub fn run(generator: &Generator, config: &RunConfig) -> anyhow::Result<Report> {
    let tenants: Vec<String> = (0..config.tenants).map(|n| format!("tenant-{n}")).collect();
    let databases: Vec<MemoryDatabase> = (0..config.tenants.max(1))
        .map(|_| MemoryDatabase::with_capabilities(config.capabilities))
        .collect();
    for db in &databases {
        db.create_all(&generator.as_dyn().schema_objects())
            .context("creating schema")?;
    }

    let barrier = Arc::new(Barrier::new(config.threads));
    let start = Instant::now();

    let per_thread: Vec<(usize, Vec<i64>)> = scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|thread| {
                let slot = thread % databases.len();
                let db = &databases[slot];
                let tenant = tenants.get(slot).map(String::as_str);
                let barrier = Arc::clone(&barrier);
                let generator = generator.as_dyn();
                s.spawn(move || -> anyhow::Result<(usize, Vec<i64>)> {
                    let session = match tenant {
                        Some(tenant) => Session::with_tenant(db, tenant),
                        None => Session::new(db),
                    };
                    barrier.wait();
                    let values = (0..config.ids_per_thread)
                        .map(|_| generator.generate(&session).map(i64::from))
                        .collect::<Result<Vec<_>, _>>()
                        .with_context(|| format!("generating on thread {thread}"))?;
                    Ok((slot, values))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(_) => bail!("a worker thread panicked"),
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let elapsed = start.elapsed();

    let mut seen: Vec<HashSet<i64>> = vec![HashSet::new(); databases.len()];
    let mut generated = 0;
    for (slot, values) in per_thread {
        generated += values.len();
        for value in values {
            if !seen[slot].insert(value) {
                bail!("identifier {value} was generated twice");
            }
        }
    }

    let report = Report {
        generated,
        unique: seen.iter().map(HashSet::len).sum(),
        accesses: generator.accesses(),
        elapsed,
    };

    tracing::info!(
        generated = report.generated,
        accesses = report.accesses,
        ?elapsed,
        "workload finished"
    );

    Ok(report)
}
