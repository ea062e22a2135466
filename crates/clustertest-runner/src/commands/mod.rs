use crate::cli::ParamArgs;
use crate::error::CliError;
use clustertest_core::params::Params;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod render;
pub mod run;
pub mod validate;

pub(crate) fn collect_params(input: &ParamArgs) -> Result<Params, CliError> {
    let mut params = Params::new();
    for arg in &input.params {
        params.add_arg(arg)?;
    }
    Ok(params)
}

/// Seeds the run's only random generator, drawing a seed when none is given.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(|| {
        let drawn = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .unsigned_abs();
        tracing::info!("Using random seed {} (pass --seed {} to replay)", drawn, drawn);
        drawn
    });
    tracing::debug!("Seeding generator with {}", seed);
    StdRng::seed_from_u64(seed)
}
