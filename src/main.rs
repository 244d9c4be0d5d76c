use std::sync::Arc;

use chlb_monitor::config::{Args, MonitorConfig};
use chlb_monitor::view::{run_headless, App};
use chlb_monitor::{logging, HttpStateSource, StatePoller};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = MonitorConfig::try_from(&args)?;

    if args.headless {
        logging::init_logger(&args.log_level);
    } else {
        logging::init_file_logger(&args.log_level, &args.log_file)?;
    }

    let source = Arc::new(HttpStateSource::new(config.endpoint.clone(), config.request_timeout));
    let mut poller = StatePoller::new(source, config.refresh_interval).start();

    let result = if args.headless {
        run_headless(&mut poller).await
    } else {
        App::new(config.endpoint.to_string()).run(&mut poller).await
    };

    poller.stop().await;
    result?;
    Ok(())
}
