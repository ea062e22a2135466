use crate::cli::ValidateArgs;
use crate::commands::{collect_params, seeded_rng};
use crate::error::CliError;
use crate::run_loop::{plan, resolve_nodes};
use clustertest_core::loader;
use colored::Colorize;

pub fn handle_validate(args: ValidateArgs) -> Result<(), CliError> {
    let params = collect_params(&args.input)?;
    let spec = loader::load_from_path(&args.input.file, &params)?;
    let mut rng = seeded_rng(args.seed);
    let partitions = plan(&spec, &mut rng)?;

    println!(
        "Test '{}' on {} nodes, {} step(s)",
        spec.name.cyan(),
        spec.config.nodes,
        spec.steps.len()
    );
    match &partitions {
        Some(map) => {
            for (id, nodes) in map.iter() {
                println!("  subset {}: {:?}", id, nodes);
            }
        }
        None => println!("  {}", "no subset partitioning".dimmed()),
    }
    for (index, step) in spec.steps.iter().enumerate() {
        let nodes = resolve_nodes(index, step, &spec.config, partitions.as_ref(), &mut rng)?;
        println!("  step {} '{}': {:?}", index + 1, step.name, nodes);
    }
    println!("{}", "Test is valid".green());
    Ok(())
}
