use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use hostmon::commands;

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    if matches.get_flag("version") {
        return commands::version();
    }

    hostmon::init_logging();

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches)?,
        Some(("ps", sub_matches)) => commands::ps(sub_matches)?,
        Some(("version", _)) => commands::version()?,
        _ => {
            println!("Use 'hostmon --help' for more information.");
        }
    }

    Ok(())
}

fn build_cli() -> Command {
    Command::new("hostmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Host metrics monitor with threshold events")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("watch")
                .about("Sample the host periodically and print events")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Milliseconds between cycles (default: 3000)")
                        .value_parser(clap::value_parser!(u64))
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .help("Run a single cycle and exit")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("immediate")
                        .long("immediate")
                        .help("Run the first cycle right away instead of after one interval")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("silent")
                        .short('s')
                        .long("silent")
                        .help("Only print threshold and lifecycle events")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("loadavg")
                        .long("loadavg")
                        .value_name("LIMIT")
                        .help("Load average limit: one value for all windows, or three for 1/5/15 minutes")
                        .num_args(1..=3)
                        .value_parser(clap::value_parser!(f64))
                )
                .arg(
                    Arg::new("freemem")
                        .long("freemem")
                        .value_name("LIMIT")
                        .help("Free memory limit: below 1 is a fraction of total, otherwise bytes")
                        .value_parser(clap::value_parser!(f64))
                )
                .arg(
                    Arg::new("freedisk")
                        .long("freedisk")
                        .value_name("LIMIT")
                        .help("Free disk limit per filesystem: below 1 is a fraction of capacity, otherwise bytes")
                        .value_parser(clap::value_parser!(f64))
                )
                .arg(
                    Arg::new("uptime")
                        .long("uptime")
                        .value_name("SECS")
                        .help("Emit an uptime event while uptime exceeds this (0 disables)")
                        .value_parser(clap::value_parser!(u64))
                )
                .arg(
                    Arg::new("no-disks")
                        .long("no-disks")
                        .help("Skip disk usage collection")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("no-processes")
                        .long("no-processes")
                        .help("Skip the process table")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("top")
                        .short('n')
                        .long("top")
                        .value_name("N")
                        .help("Number of processes to include (0 for all)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10")
                )
                .arg(
                    Arg::new("leases")
                        .long("leases")
                        .value_name("FILE")
                        .help("Include DHCP leases, optionally from FILE")
                        .num_args(0..=1)
                        .default_missing_value(hostmon::core::system_monitor::DEFAULT_LEASE_FILE)
                )
                .arg(
                    Arg::new("services")
                        .long("services")
                        .help("Include service status")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print events as JSON lines")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("ps")
                .about("List processes")
                .arg(
                    Arg::new("sort")
                        .long("sort")
                        .value_name("KEY")
                        .help("Sort by cpu, mem, pid or name")
                        .default_value("cpu")
                )
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("N")
                        .help("Number of processes to show (0 for all)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10")
                )
                .arg(
                    Arg::new("reverse")
                        .short('r')
                        .long("reverse")
                        .help("Reverse the sort order")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print as JSON")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("version")
                .about("Shows version information")
        )
}
