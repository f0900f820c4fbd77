use crate::cli::{CheckArgs, CliError, GlobalArgs, load_config, load_schema};

pub fn main(global: GlobalArgs, args: CheckArgs) -> Result<(), CliError> {
    let config = load_config(&global)?;
    let schema = load_schema(&args.files, &config)?;
    for protocol in schema.protocols() {
        let requests: usize = protocol.interfaces.iter().map(|i| i.requests.len()).sum();
        let events: usize = protocol.interfaces.iter().map(|i| i.events.len()).sum();
        log::info!(
            "{}: {} interfaces, {} requests, {} events",
            protocol.name,
            protocol.interfaces.len(),
            requests,
            events,
        );
    }
    Ok(())
}
