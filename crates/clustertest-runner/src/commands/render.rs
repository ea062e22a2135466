use crate::cli::RenderArgs;
use crate::commands::collect_params;
use crate::error::CliError;
use clustertest_core::loader;

pub fn handle_render(args: RenderArgs) -> Result<(), CliError> {
    let params = collect_params(&args.input)?;
    let rendered = loader::render_path(&args.input.file, &params)?;
    print!("{}", rendered);
    Ok(())
}
