use {
    crate::cli::{CompletionArgs, WireRelay},
    clap::CommandFactory,
    std::io::stdout,
};

pub fn main(args: CompletionArgs) {
    let stdout = stdout();
    let mut stdout = stdout.lock();
    clap_complete::generate(args.shell, &mut WireRelay::command(), "wire-relay", &mut stdout);
}
