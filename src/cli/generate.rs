use {
    crate::{
        cli::{CliError, GenerateArgs, GlobalArgs, load_config, load_schema},
        emitter,
    },
    std::path::Path,
};

pub fn main(global: GlobalArgs, args: GenerateArgs) -> Result<(), CliError> {
    let config = load_config(&global)?;
    let schema = load_schema(&args.files, &config)?;
    let mut outputs: Vec<_> = config.outputs.iter().collect();
    if let Some(project) = &args.project {
        outputs.retain(|o| &o.project == project);
        if outputs.is_empty() {
            return Err(CliError::UnknownProject(project.clone()));
        }
    }
    if args.out.is_some() && outputs.len() > 1 {
        return Err(CliError::AmbiguousOut(outputs.len()));
    }
    for output in outputs {
        let dir: &Path = args.out.as_deref().unwrap_or(&output.dir);
        let files = emitter::render(&schema, output.role)?;
        let written = emitter::write_files(dir, &files)?;
        log::info!(
            "{} ({}): {} files, {} changed, in {}",
            output.project,
            output.role.name(),
            files.len(),
            written,
            dir.display(),
        );
    }
    Ok(())
}
