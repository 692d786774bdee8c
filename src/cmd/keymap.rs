use crate::reports;
use clap::Args;
use std::process;
use tracing::{error, warn};

#[derive(Args, Debug, Clone)]
pub struct KeymapArgs {
    /// Emit JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Skip keys that produce nothing under any modifier
    #[arg(long, default_value_t = false)]
    pub only_assigned: bool,
}

pub fn run(args: KeymapArgs) {
    let map = keymapping::get_key_map();
    if map.is_empty_sentinel() {
        warn!("⚠️  Keyboard layout could not be read; every key is unassigned.");
    }

    if args.json {
        let entries: Vec<_> = map
            .iter()
            .filter(|e| !args.only_assigned || !e.is_unassigned())
            .collect();
        match serde_json::to_string_pretty(&entries) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("❌ Cannot serialize key map: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    reports::print_key_map(&map, args.only_assigned);
}
