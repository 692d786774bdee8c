use crate::reports;
use clap::Args;
use std::process;
use tracing::error;

#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: LayoutArgs) {
    let layout = keymapping::get_current_keyboard_layout();

    if args.json {
        match serde_json::to_string_pretty(&layout) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("❌ Cannot serialize layout: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    reports::print_layout(layout.as_ref());
}
