use std::env;
use vein::config::Config;
use vein::flags::Flags;
use vein::process::signal;
use vein::shell::Shell;

fn main() -> Result<(), vein::error::ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(());
    }

    if flags.is_set("version") {
        println!("vein {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_flags(&flags)?;
    vein::logging::init(config.debug);

    let mut shell = Shell::new(config)?;
    signal::install_handlers(shell.state().signals())?;
    shell.run()
}
